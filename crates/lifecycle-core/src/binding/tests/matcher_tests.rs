use super::fixtures::{Database, Worker};
use crate::binding::TypeMatcher;
use crate::stager::TypeDescriptor;

#[test]
fn test_any_matches_everything() {
    assert!(TypeMatcher::Any.matches(&TypeDescriptor::of::<Database>()));
    assert!(TypeMatcher::default().matches(&TypeDescriptor::of::<u8>()));
}

#[test]
fn test_exactly_matches_one_type() {
    let matcher = TypeMatcher::exactly::<Database>();

    assert!(matcher.matches(&TypeDescriptor::of::<Database>()));
    assert!(!matcher.matches(&TypeDescriptor::of::<Worker>()));
}

#[test]
fn test_one_of_and_predicate() {
    let matcher = TypeMatcher::OneOf(vec![TypeDescriptor::of::<Database>(), TypeDescriptor::of::<Worker>()]);
    assert!(matcher.matches(&TypeDescriptor::of::<Worker>()));
    assert!(!matcher.matches(&TypeDescriptor::of::<String>()));

    let by_name = TypeMatcher::predicate(|ty| ty.name().ends_with("Worker"));
    assert!(by_name.matches(&TypeDescriptor::of::<Worker>()));
    assert!(!by_name.matches(&TypeDescriptor::of::<Database>()));
    assert_eq!(format!("{:?}", by_name), "Predicate(..)");
}
