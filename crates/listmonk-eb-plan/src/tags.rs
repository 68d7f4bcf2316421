//! Resource tag lists

use listmonk_eb_types::{Properties, Property, SubnetType};

fn tag(key: &str, value: &str) -> Properties {
    Properties::new().with("Key", key).with("Value", value)
}

/// A single `Name` tag
pub(crate) fn name(value: &str) -> Property {
    Property::list([tag("Name", value)])
}

/// `Name` plus the subnet's routing type
pub(crate) fn subnet(path: &str, subnet_type: SubnetType) -> Property {
    Property::list([tag("Name", path), tag("SubnetType", subnet_type.label())])
}
