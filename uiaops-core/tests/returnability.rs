//! Returnability: which wrapper types are legal outputs of a remote batch.
//!
//! The positive direction is checked by instantiating
//! [`can_be_returned`](uiaops_core::wrapper::can_be_returned) for every
//! wrapper type -- this file failing to compile is the test failing.  The
//! negative direction (a cache request must be rejected) is the
//! `compile_fail` doctest on `can_be_returned` itself, since a successful
//! compilation of this crate cannot witness a compile error.

use uiaops_core::errors::OperationError;
use uiaops_core::value::{AutomationValue, ElementHandle, MaterializedElement};
use uiaops_core::wrapper::{
    can_be_returned, FromRemoteResult, UiaBool, UiaElement, UiaInt, UiaString, UiaTextPattern,
    UiaTextRange,
};

#[test]
fn test_all_wrapper_types_are_returnable() {
    can_be_returned::<UiaElement>();
    can_be_returned::<UiaTextPattern>();
    can_be_returned::<UiaTextRange>();
    can_be_returned::<UiaString>();
    can_be_returned::<UiaBool>();
    can_be_returned::<UiaInt>();
}

#[test]
fn test_element_from_remote_result() {
    let element = UiaElement::from_remote_result(AutomationValue::Element(
        MaterializedElement::bare(ElementHandle(12)),
    ))
    .unwrap();
    assert!(!element.is_null().unwrap());
    assert_eq!(element.handle().unwrap(), Some(ElementHandle(12)));

    // A null result is a null element, not an error.
    let element = UiaElement::from_remote_result(AutomationValue::Null).unwrap();
    assert!(element.is_null().unwrap());
}

#[test]
fn test_pattern_from_remote_result() {
    let pattern = UiaTextPattern::from_remote_result(AutomationValue::Pattern(None)).unwrap();
    assert!(pattern.is_null().unwrap());
}

#[test]
fn test_mismatched_raw_values_are_conversion_errors() {
    assert!(matches!(
        UiaElement::from_remote_result(AutomationValue::Int(1)).unwrap_err(),
        OperationError::Conversion(_)
    ));
    assert!(matches!(
        UiaTextRange::from_remote_result(AutomationValue::Null).unwrap_err(),
        OperationError::Conversion(_)
    ));
    assert!(matches!(
        UiaString::from_remote_result(AutomationValue::Bool(true)).unwrap_err(),
        OperationError::Conversion(_)
    ));
}
