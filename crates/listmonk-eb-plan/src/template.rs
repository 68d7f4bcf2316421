//! Template rendering
//!
//! Renders a plan into the JSON document the provisioning engine consumes.
//! References become intrinsic functions; secret fields become dynamic
//! references the engine resolves at apply time.

use crate::error::Result;
use crate::plan::Plan;
use listmonk_eb_types::{Property, Resource, Value};
use serde_json::{json, Map, Value as Json};

/// Render a plan as a template document.
pub fn render(plan: &Plan) -> Json {
    let mut resources = Map::new();
    for resource in plan.resources() {
        resources.insert(resource.id.to_string(), render_resource(resource));
    }

    let mut outputs = Map::new();
    for output in plan.outputs() {
        outputs.insert(
            output.name.clone(),
            json!({
                "Description": output.description,
                "Value": render_value(&output.value),
            }),
        );
    }

    json!({
        "Description": format!("listmonk on Elastic Beanstalk ({})", plan.stack_name),
        "Metadata": {
            "Grants": plan.grants(),
            "Assets": plan.assets(),
        },
        "Resources": resources,
        "Outputs": outputs,
    })
}

/// Render and pretty-print.
pub fn to_string_pretty(plan: &Plan) -> Result<String> {
    Ok(serde_json::to_string_pretty(&render(plan))?)
}

fn render_resource(resource: &Resource) -> Json {
    let mut body = Map::new();
    body.insert("Type".into(), Json::from(resource.kind.type_name()));

    let mut properties = Map::new();
    for (key, value) in resource.properties().iter() {
        properties.insert(key.clone(), render_property(value));
    }
    if !properties.is_empty() {
        body.insert("Properties".into(), Json::Object(properties));
    }

    // Edges already implied by a reference are left to the engine.
    let referenced = resource.referenced();
    let explicit: Vec<Json> = resource
        .dependencies()
        .iter()
        .filter(|id| !referenced.contains(*id))
        .map(|id| Json::from(id.as_str()))
        .collect();
    if !explicit.is_empty() {
        body.insert("DependsOn".into(), Json::Array(explicit));
    }

    if let Some(policy) = resource.deletion_policy {
        body.insert("DeletionPolicy".into(), Json::from(policy.as_str()));
    }
    if let Some(policy) = resource.update_replace_policy {
        body.insert("UpdateReplacePolicy".into(), Json::from(policy.as_str()));
    }
    Json::Object(body)
}

fn render_property(property: &Property) -> Json {
    match property {
        Property::Value(v) => render_value(v),
        Property::Bool(b) => Json::Bool(*b),
        Property::Int(i) => Json::from(*i),
        Property::Number(n) => json!(n),
        Property::List(items) => Json::Array(items.iter().map(render_property).collect()),
        Property::Map(map) => Json::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), render_property(v)))
                .collect(),
        ),
    }
}

/// Render a value as a literal or intrinsic function
pub fn render_value(value: &Value) -> Json {
    match value {
        Value::Literal(s) => Json::from(s.as_str()),
        Value::Ref(target) => json!({ "Ref": target.as_str() }),
        Value::GetAtt { target, attribute } => {
            json!({ "Fn::GetAtt": [target.as_str(), attribute] })
        }
        Value::Join { delimiter, parts } => json!({
            "Fn::Join": [delimiter, parts.iter().map(render_value).collect::<Vec<_>>()]
        }),
        Value::SecretField { secret, field } => json!({
            "Fn::Join": ["", [
                "{{resolve:secretsmanager:",
                { "Ref": secret.as_str() },
                format!(":SecretString:{field}::}}}}"),
            ]]
        }),
    }
}
