use formbind::{AttrLens, Record};

#[derive(Clone, formbind::Record)]
struct DemoRecord {
    #[record(identity)]
    id: Option<u64>,
    email: String,
}

fn main() {
    let fields = DemoRecord::fields();
    let lens = fields.email();
    let mut record = DemoRecord {
        id: None,
        email: "a@formbind.dev".to_string(),
    };
    lens.set(&mut record, "b@formbind.dev".to_string());
    assert_eq!(lens.key().as_str(), "email");
    assert_eq!(lens.get(&record), "b@formbind.dev");
    assert_eq!(DemoRecord::identity_attr().map(|attr| attr.as_str()), Some("id"));
    assert!(!record.has_identity());
}
