use resmap::*;

#[derive(Resource, Debug, Default, PartialEq)]
struct Tag {
    #[resource(id)]
    id: u64,
    #[resource(attr = "label,unique")]
    label: String,
}

fn main() {
    let registry = Registry::new();
    let schema = registry.register::<Tag>().unwrap();
    assert_eq!(schema.wire_type, "tag");
    let tag = Tag { id: 7, label: "rust".to_string() };
    let instance = Instance::from_domain(&schema, &tag).unwrap();
    assert_eq!(instance.to_domain::<Tag>().unwrap(), tag);
}
