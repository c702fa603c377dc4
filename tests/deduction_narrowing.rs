mod common;

use common::deduce_at_marker;

fn deduce(src: &str, expression: &str) -> Vec<String> {
    deduce_at_marker("/src/narrowing.php", src, expression)
}

// ─── instanceof ─────────────────────────────────────────────────────────────

#[test]
fn test_instanceof_narrows_inside_the_branch() {
    let src = concat!(
        "<?php\n",
        "namespace App;\n",
        "function f($x) {\n",
        "    if ($x instanceof \\A\\B) {\n",
        "        /*|*/\n",
        "    }\n",
        "}\n",
    );
    assert_eq!(deduce(src, "$x"), vec!["\\A\\B"]);
}

/// The narrowing does not leak past the `if`.
#[test]
fn test_instanceof_does_not_leak() {
    let src = concat!(
        "<?php\n",
        "namespace App;\n",
        "function f($x) {\n",
        "    if ($x instanceof \\A\\B) {\n",
        "    }\n",
        "    /*|*/\n",
        "}\n",
    );
    assert!(deduce(src, "$x").is_empty());
}

#[test]
fn test_logical_operators() {
    let and = concat!(
        "<?php\n",
        "namespace App;\n",
        "function f($x) {\n",
        "    if ($x instanceof B && $x instanceof C) {\n",
        "        /*|*/\n",
        "    }\n",
        "}\n",
    );
    assert_eq!(deduce(and, "$x"), vec!["\\App\\B", "\\App\\C"]);

    let or = concat!(
        "<?php\n",
        "namespace App;\n",
        "function f($x) {\n",
        "    if ($x instanceof B || $x === null) {\n",
        "        /*|*/\n",
        "    }\n",
        "}\n",
    );
    assert_eq!(deduce(or, "$x"), vec!["\\App\\B", "null"]);

    // Only one side narrows: nothing can be concluded.
    let partial = concat!(
        "<?php\n",
        "function f(Foo $x) {\n",
        "    if ($x instanceof Bar || check()) {\n",
        "        /*|*/\n",
        "    }\n",
        "}\n",
    );
    assert_eq!(deduce(partial, "$x"), vec!["\\Foo"]);
}

/// `elseif` and `else` see the previous conditions as false.
#[test]
fn test_else_branches_negate_conditions() {
    let src = concat!(
        "<?php\n",
        "function f(?Foo $x) {\n",
        "    if ($x === null) {\n",
        "        return;\n",
        "    } else {\n",
        "        /*|*/\n",
        "    }\n",
        "}\n",
    );
    assert_eq!(deduce(src, "$x"), vec!["\\Foo"]);

    let elseif = concat!(
        "<?php\n",
        "function f(?Foo $x) {\n",
        "    if ($x !== null) {\n",
        "    } elseif (check()) {\n",
        "        /*|*/\n",
        "    }\n",
        "}\n",
    );
    assert_eq!(deduce(elseif, "$x"), vec!["null"]);
}

// ─── Null guards and type checks ────────────────────────────────────────────

#[test]
fn test_null_guards() {
    let truthy = concat!(
        "<?php\n",
        "function f(?Foo $x) {\n",
        "    if ($x) {\n",
        "        /*|*/\n",
        "    }\n",
        "}\n",
    );
    assert_eq!(deduce(truthy, "$x"), vec!["\\Foo"]);

    let falsy = concat!(
        "<?php\n",
        "function f(?Foo $x) {\n",
        "    if (!$x) {\n",
        "        /*|*/\n",
        "    }\n",
        "}\n",
    );
    assert_eq!(deduce(falsy, "$x"), vec!["null"]);

    let not_null = concat!(
        "<?php\n",
        "function f(?Foo $x) {\n",
        "    if (null != $x) {\n",
        "        /*|*/\n",
        "    }\n",
        "}\n",
    );
    assert_eq!(deduce(not_null, "$x"), vec!["\\Foo"]);
}

#[test]
fn test_type_check_functions() {
    let string = concat!(
        "<?php\n",
        "function f(int|string|null $v) {\n",
        "    if (is_string($v)) {\n",
        "        /*|*/\n",
        "    }\n",
        "}\n",
    );
    assert_eq!(deduce(string, "$v"), vec!["string"]);

    // Nothing matches: the checked type is taken as is.
    let array = concat!(
        "<?php\n",
        "function f(int|string $v) {\n",
        "    if (is_array($v)) {\n",
        "        /*|*/\n",
        "    }\n",
        "}\n",
    );
    assert_eq!(deduce(array, "$v"), vec!["array"]);

    let not_null = concat!(
        "<?php\n",
        "function f(?Foo $v) {\n",
        "    if (!is_null($v)) {\n",
        "        /*|*/\n",
        "    }\n",
        "}\n",
    );
    assert_eq!(deduce(not_null, "$v"), vec!["\\Foo"]);
}

/// Ternary branches and the right operand of `&&` are narrowed too.
#[test]
fn test_narrowing_inside_expressions() {
    let ternary = concat!(
        "<?php\n",
        "function f($x) {\n",
        "    $y = $x instanceof Foo ? $x/*|*/ : null;\n",
        "}\n",
    );
    assert_eq!(deduce(ternary, "$x"), vec!["\\Foo"]);

    let and = concat!(
        "<?php\n",
        "function f(?Foo $x) {\n",
        "    $ok = $x !== null && $x/*|*/->valid();\n",
        "}\n",
    );
    assert_eq!(deduce(and, "$x"), vec!["\\Foo"]);
}

#[test]
fn test_while_condition_narrows_the_body() {
    let src = concat!(
        "<?php\n",
        "function f(?Node $node) {\n",
        "    while ($node !== null) {\n",
        "        /*|*/\n",
        "    }\n",
        "}\n",
    );
    assert_eq!(deduce(src, "$node"), vec!["\\Node"]);
}

// ─── foreach and catch ──────────────────────────────────────────────────────

#[test]
fn test_foreach_value_and_key() {
    let src = concat!(
        "<?php\n",
        "/** @param array<int, Item> $items */\n",
        "function f(array $items) {\n",
        "    foreach ($items as $key => $item) {\n",
        "        /*|*/\n",
        "    }\n",
        "}\n",
    );
    assert_eq!(deduce(src, "$items"), vec!["\\Item[]"]);
    assert_eq!(deduce(src, "$item"), vec!["\\Item"]);
    assert_eq!(deduce(src, "$key"), vec!["int", "string"]);
}

#[test]
fn test_foreach_over_iterable_class() {
    let src = concat!(
        "<?php\n",
        "namespace App;\n",
        "/** @param \\Traversable<int, Item> $items */\n",
        "function f($items) {\n",
        "    foreach ($items as $item) {\n",
        "        /*|*/\n",
        "    }\n",
        "}\n",
    );
    assert_eq!(deduce(src, "$item"), vec!["\\App\\Item"]);
}

#[test]
fn test_catch_variable() {
    let src = concat!(
        "<?php\n",
        "namespace App;\n",
        "try {\n",
        "    run();\n",
        "} catch (NotFound | \\RuntimeException $e) {\n",
        "    /*|*/\n",
        "}\n",
    );
    assert_eq!(deduce(src, "$e"), vec!["\\App\\NotFound", "\\RuntimeException"]);
}

#[test]
fn test_switch_cases_before_position_may_not_run() {
    let src = concat!(
        "<?php\n",
        "$a = new A();\n",
        "switch (mode()) {\n",
        "    case 1:\n",
        "        $a = new B();\n",
        "        break;\n",
        "    default:\n",
        "        /*|*/\n",
        "}\n",
    );
    assert_eq!(deduce(src, "$a"), vec!["\\A", "\\B"]);
}

// ─── Closures ───────────────────────────────────────────────────────────────

/// A by-value capture sees the value at closure creation.
#[test]
fn test_closure_use_by_value() {
    let src = concat!(
        "<?php\n",
        "$a = new A();\n",
        "$fn = function () use ($a) {\n",
        "    /*|*/\n",
        "};\n",
        "$a = new B();\n",
    );
    assert_eq!(deduce(src, "$a"), vec!["\\A"]);
}

/// A by-reference capture also sees later assignments.
#[test]
fn test_closure_use_by_reference() {
    let src = concat!(
        "<?php\n",
        "$a = new A();\n",
        "$fn = function () use (&$a) {\n",
        "    /*|*/\n",
        "};\n",
        "$a = new B();\n",
    );
    assert_eq!(deduce(src, "$a"), vec!["\\A", "\\B"]);
}

#[test]
fn test_closure_scope_is_isolated() {
    let uncaptured = concat!(
        "<?php\n",
        "$a = new A();\n",
        "$fn = function () {\n",
        "    /*|*/\n",
        "};\n",
    );
    assert!(deduce(uncaptured, "$a").is_empty());

    let parameter = concat!(
        "<?php\n",
        "$a = new A();\n",
        "$fn = function (Foo $a) {\n",
        "    /*|*/\n",
        "};\n",
    );
    assert_eq!(deduce(parameter, "$a"), vec!["\\Foo"]);
}

/// Arrow functions capture the outer scope; parameters shadow it.
#[test]
fn test_arrow_functions() {
    let captured = concat!(
        "<?php\n",
        "$a = new A();\n",
        "$fn = fn($x) => $a/*|*/;\n",
    );
    assert_eq!(deduce(captured, "$a"), vec!["\\A"]);

    let shadowed = concat!(
        "<?php\n",
        "$a = new A();\n",
        "$fn = fn(B $a) => $a/*|*/;\n",
    );
    assert_eq!(deduce(shadowed, "$a"), vec!["\\B"]);
}

#[test]
fn test_closure_as_argument() {
    let src = concat!(
        "<?php\n",
        "array_map(function (Item $item) {\n",
        "    /*|*/\n",
        "}, $list);\n",
    );
    assert_eq!(deduce(src, "$item"), vec!["\\Item"]);
}

// ─── Inline @var ────────────────────────────────────────────────────────────

#[test]
fn test_inline_var_on_assignment() {
    let named = concat!(
        "<?php\n",
        "/** @var Foo $x */\n",
        "$x = make();\n",
        "/*|*/\n",
    );
    assert_eq!(deduce(named, "$x"), vec!["\\Foo"]);

    let unnamed = concat!(
        "<?php\n",
        "/** @var Foo */\n",
        "$x = make();\n",
        "/*|*/\n",
    );
    assert_eq!(deduce(unnamed, "$x"), vec!["\\Foo"]);
}

/// A named `@var` overrides what came before it; later assignments
/// replace it again.
#[test]
fn test_named_var_override_is_positional() {
    let at_position = concat!(
        "<?php\n",
        "function f() {\n",
        "    $x = new A();\n",
        "    /** @var B|null $x */\n",
        "    /*|*/\n",
        "}\n",
    );
    assert_eq!(deduce(at_position, "$x"), vec!["\\B", "null"]);

    let before_statement = concat!(
        "<?php\n",
        "$x = new A();\n",
        "/** @var B $x */\n",
        "prepare();\n",
        "/*|*/\n",
    );
    assert_eq!(deduce(before_statement, "$x"), vec!["\\B"]);

    let reassigned = concat!(
        "<?php\n",
        "/** @var \\A $x */\n",
        "$x = make();\n",
        "$x = new \\B();\n",
        "/*|*/\n",
    );
    assert_eq!(deduce(reassigned, "$x"), vec!["\\B"]);
}

/// A `@var` inside a closure body stays in the closure.
#[test]
fn test_closure_var_annotation_does_not_leak() {
    let src = concat!(
        "<?php\n",
        "$x = new \\A();\n",
        "$cb = function () {\n",
        "    /** @var \\B $x */\n",
        "    $x = make();\n",
        "};\n",
        "/*|*/\n",
    );
    assert_eq!(deduce(src, "$x"), vec!["\\A"]);
}

#[test]
fn test_inline_var_on_foreach() {
    let src = concat!(
        "<?php\n",
        "/** @var Item $item */\n",
        "foreach (load() as $item) {\n",
        "    /*|*/\n",
        "}\n",
    );
    assert_eq!(deduce(src, "$item"), vec!["\\Item"]);
}
