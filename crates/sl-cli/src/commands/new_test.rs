use super::*;

#[test]
fn test_slugify() {
    assert_eq!(slugify("Add vendor notes"), "add_vendor_notes");
    assert_eq!(slugify("  tags -> colours!! "), "tags_colours");
    assert_eq!(slugify("Income/Expense v2"), "income_expense_v2");
    assert_eq!(slugify("---"), "");
}

#[test]
fn test_next_number_starts_at_one() {
    assert_eq!(next_number(std::iter::empty()), 1);
}

#[test]
fn test_next_number_follows_greatest_prefix() {
    let versions = [
        Version::new("001_init"),
        Version::new("010_tags"),
        Version::new("002_seed"),
        Version::new("notes"),
    ];
    assert_eq!(next_number(versions.iter()), 11);
}
