/*
 * Host Type Tests
 *
 * Expressions over a host class registered with the engine: fields,
 * methods, arrays, constructors with object initializers, and the
 * diagnostics produced for members that do not exist.
 */

#[macro_use]
mod cases;

use cases::{test_class_type, test_object};
use cseval::{Type, Value};

test_case! {
    name: field_read,
    input: "arg1.IntField * 2",
    args: [("arg1", test_class_type(), test_object(7))],
    value: Value::Int32(14),
}

test_case! {
    name: instance_method_call,
    input: "arg1.Twice(arg1.IntField)",
    args: [("arg1", test_class_type(), test_object(21))],
    value: Value::Int32(42),
}

test_case! {
    name: host_method_fault_propagates,
    input: "arg1.Twice(int.MaxValue)",
    args: [("arg1", test_class_type(), test_object(0))],
    fault: Overflow,
}

test_case! {
    name: array_field_length,
    input: "arg1.ArrayField.Length",
    args: [("arg1", test_class_type(), test_object(0))],
    value: Value::Int32(3),
}

test_case! {
    name: array_index_out_of_range,
    input: "arg1.ArrayField[5]",
    args: [("arg1", test_class_type(), test_object(0))],
    fault: IndexOutOfRange,
}

test_case! {
    name: array_predicate_with_lambda,
    input: "Array.Exists(arg1.ArrayField, x => x > arg1.IntField)",
    args: [("arg1", test_class_type(), test_object(2))],
    value: Value::Bool(true),
}

test_case! {
    name: constructor_with_object_initializer,
    input: "(new TestClass { IntField = 5 }).IntField + 1",
    value: Value::Int32(6),
}

test_case! {
    name: nested_object_initializer,
    input: "(new TestClass { TestClassField = new TestClass { IntField = 3 } }).TestClassField?.IntField",
    value: Value::Int32(3),
}

test_case! {
    name: object_is_and_as,
    input: "o is TestClass && (o as TestClass).IntField == 9",
    args: [("o", Type::Object, test_object(9))],
    value: Value::Bool(true),
}

test_case! {
    name: failed_cast_faults,
    input: "((TestClass)o).IntField",
    args: [("o", Type::Object, Value::string("nope"))],
    fault: InvalidCast,
}

test_case! {
    name: misspelled_member,
    input: "arg1.IntFeild",
    args: [("arg1", test_class_type(), test_object(0))],
    error: "B003",
}

test_case! {
    name: wrong_argument_type,
    input: "arg1.Twice(\"x\")",
    args: [("arg1", test_class_type(), test_object(0))],
    error: "B004",
}
