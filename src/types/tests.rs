use super::*;
use crate::ast::DurationUnit;
use crate::entity::Dictionary;

fn binary(op: BinaryOperator, lhs: &Entity, rhs: &Entity) -> EvalResult {
    lhs.type_().binary(op, lhs, rhs)
}

/* ===================== Arithmetic ===================== */

#[test]
fn test_integer_addition() {
    let result = binary(BinaryOperator::Plus, &Entity::integer(2), &Entity::integer(3)).unwrap();
    assert_eq!(result.as_integer(), Some(5));
}

#[test]
fn test_integer_plus_real_is_real() {
    let result = binary(BinaryOperator::Plus, &Entity::integer(2), &Entity::real(3.0)).unwrap();
    assert_eq!(result.type_name(), "real");
    assert_eq!(result.as_real(), Some(5.0));
}

#[test]
fn test_string_plus_integer_has_no_operator() {
    let err = binary(BinaryOperator::Plus, &Entity::string("a"), &Entity::integer(1)).unwrap_err();
    assert_eq!(err.kind, EvaluationErrorKind::NoMatchingOperator);
    assert_eq!(
        err.message,
        "No matching operator '+' for types 'string' and 'integer'"
    );
}

#[test]
fn test_integer_division() {
    let result = binary(BinaryOperator::Div, &Entity::integer(7), &Entity::integer(2)).unwrap();
    assert_eq!(result.as_integer(), Some(3));

    let err = binary(BinaryOperator::Div, &Entity::integer(7), &Entity::integer(0)).unwrap_err();
    assert_eq!(err.message, "Division by zero");
}

#[test]
fn test_unary_operators() {
    let minus = integer().unary(UnaryOperator::Minus, &Entity::integer(4)).unwrap();
    assert_eq!(minus.as_integer(), Some(-4));

    let not = boolean().unary(UnaryOperator::Not, &Entity::boolean(true)).unwrap();
    assert_eq!(not.as_boolean(), Some(false));

    let err = string().unary(UnaryOperator::Minus, &Entity::string("x")).unwrap_err();
    assert_eq!(err.message, "No matching operator '-' for type 'string'");
}

#[test]
fn test_string_concatenation_and_contains() {
    let joined = binary(BinaryOperator::Plus, &Entity::string("ab"), &Entity::string("cd")).unwrap();
    assert_eq!(joined.as_string().as_deref(), Some("abcd"));

    let found = binary(BinaryOperator::In, &joined, &Entity::string("bc")).unwrap();
    assert_eq!(found.as_boolean(), Some(true));
}

/* ===================== Comparison ===================== */

#[test]
fn test_mixed_numeric_comparison() {
    let less = binary(BinaryOperator::Less, &Entity::integer(2), &Entity::real(2.5)).unwrap();
    assert_eq!(less.as_boolean(), Some(true));

    let eq = binary(BinaryOperator::Eq, &Entity::real(3.0), &Entity::integer(3)).unwrap();
    assert_eq!(eq.as_boolean(), Some(true));
}

#[test]
fn test_logical_operators_need_booleans() {
    let and = binary(BinaryOperator::And, &Entity::boolean(true), &Entity::boolean(false)).unwrap();
    assert_eq!(and.as_boolean(), Some(false));

    assert!(binary(BinaryOperator::Or, &Entity::boolean(true), &Entity::integer(1)).is_err());
}

/* ===================== Durations ===================== */

#[test]
fn test_duration_sum_uses_finer_unit() {
    let sum = binary(
        BinaryOperator::Plus,
        &Entity::duration(1, DurationUnit::Sec),
        &Entity::duration(250, DurationUnit::Ms),
    )
    .unwrap();
    assert_eq!(sum.representation(), "1250ms");
}

#[test]
fn test_duration_sum_keeps_uneven_units_exact() {
    let month = Entity::duration(1, DurationUnit::Month);

    let sum = binary(BinaryOperator::Plus, &month, &Entity::duration(1, DurationUnit::Week)).unwrap();
    assert_eq!(sum.as_duration().map(|d| d.millis()), Some(37 * 86_400_000));
    assert_eq!(sum.as_duration().map(|d| d.unit), Some(DurationUnit::Ms));

    let difference =
        binary(BinaryOperator::Minus, &month, &Entity::duration(4, DurationUnit::Week)).unwrap();
    assert_eq!(difference.as_duration().map(|d| d.millis()), Some(2 * 86_400_000));

    let weeks = binary(
        BinaryOperator::Plus,
        &Entity::duration(2, DurationUnit::Week),
        &Entity::duration(7, DurationUnit::Day),
    )
    .unwrap();
    assert_eq!(weeks.representation(), "21day");
}

#[test]
fn test_duration_scaling() {
    let twice = binary(
        BinaryOperator::Mult,
        &Entity::duration(3, DurationUnit::Min),
        &Entity::integer(2),
    )
    .unwrap();
    assert_eq!(twice.representation(), "6min");

    let third = binary(
        BinaryOperator::Div,
        &Entity::duration(1, DurationUnit::Sec),
        &Entity::integer(4),
    )
    .unwrap();
    assert_eq!(third.representation(), "250ms");
}

#[test]
fn test_duration_comparison_by_elapsed_time() {
    let result = binary(
        BinaryOperator::Greater,
        &Entity::duration(1, DurationUnit::Min),
        &Entity::duration(59, DurationUnit::Sec),
    )
    .unwrap();
    assert_eq!(result.as_boolean(), Some(true));
}

#[test]
fn test_time_point_shift() {
    let start = time_point()
        .construct(Entity::string("2024-01-01T00:00:00Z"))
        .unwrap();
    let later = binary(
        BinaryOperator::Plus,
        &start,
        &Entity::duration(2, DurationUnit::Day),
    )
    .unwrap();
    assert_eq!(later.representation(), "2024-01-03T00:00:00+00:00");

    let elapsed = binary(BinaryOperator::Minus, &later, &start).unwrap();
    assert_eq!(elapsed.as_duration().map(|d| d.millis()), Some(2 * 86_400_000));
}

/* ===================== Containers ===================== */

#[test]
fn test_array_contains_and_size() {
    let items = Entity::array(vec![Entity::integer(1), Entity::string("two")]);
    let found = binary(BinaryOperator::In, &items, &Entity::string("two")).unwrap();
    assert_eq!(found.as_boolean(), Some(true));

    let size = items.type_().get_property(&items, "size").unwrap();
    assert_eq!(size.as_integer(), Some(2));
    assert_eq!(items.representation(), "[1, two]");
}

#[test]
fn test_dictionary_property_lookup_order() {
    let mut contents = Dictionary::new();
    contents.insert("name", Entity::string("lamp"));
    let dict = Entity::dictionary(contents);
    let t = dict.type_();

    assert_eq!(t.get_property(&dict, "size").unwrap().as_integer(), Some(1));
    assert!(matches!(
        t.get_property(&dict, "insert").unwrap(),
        Entity::MemberFunction(_)
    ));
    assert_eq!(
        t.get_property(&dict, "name").unwrap().as_string().as_deref(),
        Some("lamp")
    );

    let err = t.get_property(&dict, "missing").unwrap_err();
    assert_eq!(err.message, "Property 'missing' not found");
}

#[test]
fn test_host_kind_constructed_from_dictionary() {
    let mut contents = Dictionary::new();
    contents.insert("url", Entity::string("http://localhost"));
    let request = host(HostKind::HttpRequest)
        .construct(Entity::dictionary(contents))
        .unwrap();
    assert_eq!(request.type_name(), "http_request");
    assert_eq!(request.representation(), "(url=http://localhost)");
}

/* ===================== Assignment / Conversion ===================== */

#[test]
fn test_integer_assignment_narrows_real() {
    let target = Entity::integer(1);
    let result = integer().assign(&target, &Entity::real(4.7)).unwrap();
    assert_eq!(result.as_integer(), Some(4));
    assert!(result.shares_storage(&target));
}

#[test]
fn test_assignment_kind_mismatch() {
    let err = string()
        .assign(&Entity::string("x"), &Entity::integer(1))
        .unwrap_err();
    assert_eq!(
        err.message,
        "Invalid assignment. Expected 'string' while provided a 'integer'"
    );
}

#[test]
fn test_convert_to_boolean() {
    let value = Entity::integer(0);
    let converted = value.type_().convert(&value, boolean()).unwrap();
    assert_eq!(converted.as_boolean(), Some(false));

    let dict = Entity::dictionary(Dictionary::new());
    let err = void().convert(&Entity::Void, boolean()).unwrap_err();
    assert_eq!(err.message, "Type 'void' not convertible to 'boolean'");
    assert_eq!(
        dict.type_().convert(&dict, boolean()).unwrap().as_boolean(),
        Some(false)
    );
}

/* ===================== Registry ===================== */

#[test]
fn test_find_by_name() {
    assert!(same_type(find("integer").unwrap(), integer()));
    assert!(same_type(find("device_info_reply").unwrap(), host(HostKind::DeviceInfoReply)));
    assert!(find("unicorn").is_none());
    assert!(!same_type(integer(), real()));
}

#[test]
fn test_every_registered_type_is_found_by_name() {
    let types = all();
    assert_eq!(types.len(), 22);
    for t in types {
        let found = find(t.name).unwrap_or_else(|| panic!("'{}' not registered", t.name));
        assert!(same_type(found, t), "{}", t.name);
    }
}

#[test]
fn test_construct_defaults() {
    assert_eq!(integer().construct(Entity::Void).unwrap().as_integer(), Some(0));
    assert_eq!(
        string().construct(Entity::Void).unwrap().as_string().as_deref(),
        Some("")
    );
    assert_eq!(duration().construct(Entity::Void).unwrap().representation(), "0ms");
    assert!(free_function().construct(Entity::Void).is_err());
}
