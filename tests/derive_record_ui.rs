#[test]
fn record_derive_ui() {
    let testcases = trybuild::TestCases::new();
    testcases.pass("tests/ui/record/pass.rs");
}
