mod common;

use common::{deduce_at_marker, deduce_with, indexed_backend, marker_offset};
use phpantom_core::errors::NodeError;

// ─── Assignments ────────────────────────────────────────────────────────────

#[test]
fn test_ternary_assignment() {
    let src = concat!(
        "<?php\n",
        "$c = true ? new C() : null;\n",
        "/*|*/\n",
    );
    assert_eq!(deduce_at_marker("/src/a.php", src, "$c"), vec!["\\C", "null"]);
}

#[test]
fn test_reassignment_replaces() {
    let src = concat!(
        "<?php\n",
        "namespace App;\n",
        "$a = new First();\n",
        "$a = new Second();\n",
        "/*|*/\n",
    );
    assert_eq!(deduce_at_marker("/src/a.php", src, "$a"), vec!["\\App\\Second"]);
}

/// An assignment in a branch that may not have run adds to the
/// candidates.
#[test]
fn test_branch_assignment_appends() {
    let src = concat!(
        "<?php\n",
        "$a = new A();\n",
        "if (check()) {\n",
        "    $a = new B();\n",
        "} else {\n",
        "    $a = null;\n",
        "}\n",
        "/*|*/\n",
    );
    assert_eq!(
        deduce_at_marker("/src/a.php", src, "$a"),
        vec!["\\A", "\\B", "null"]
    );
}

/// Inside one branch, the sibling branches are ignored.
#[test]
fn test_branch_holding_position_skips_siblings() {
    let src = concat!(
        "<?php\n",
        "$a = new A();\n",
        "if (check()) {\n",
        "    $a = new B();\n",
        "} else {\n",
        "    /*|*/\n",
        "}\n",
    );
    assert_eq!(deduce_at_marker("/src/a.php", src, "$a"), vec!["\\A"]);
}

#[test]
fn test_chained_assignment() {
    let src = concat!(
        "<?php\n",
        "$a = $b = new Foo();\n",
        "/*|*/\n",
    );
    assert_eq!(deduce_at_marker("/src/a.php", src, "$a"), vec!["\\Foo"]);
    assert_eq!(deduce_at_marker("/src/a.php", src, "$b"), vec!["\\Foo"]);
}

#[test]
fn test_literals_and_operators() {
    let src = concat!(
        "<?php\n",
        "$s = 'a' . 'b';\n",
        "$n = -1;\n",
        "$f = 1.5;\n",
        "$b = !$s;\n",
        "$l = [1, 2];\n",
        "$c = $missing ?? 'fallback';\n",
        "/*|*/\n",
    );
    let deduce = |expr: &str| deduce_at_marker("/src/a.php", src, expr);
    assert_eq!(deduce("$s"), vec!["string"]);
    assert_eq!(deduce("$n"), vec!["int"]);
    assert_eq!(deduce("$f"), vec!["float"]);
    assert_eq!(deduce("$b"), vec!["bool"]);
    assert_eq!(deduce("$l"), vec!["array"]);
    assert_eq!(deduce("$c"), vec!["string"]);
    assert_eq!(deduce("1 <=> 2"), vec!["int"]);
    assert!(deduce("$nothing").is_empty());
}

/// A variable never assigned has no candidates.
#[test]
fn test_unknown_variable_is_empty() {
    let src = "<?php\n$a = 1;\n/*|*/\n";
    assert!(deduce_at_marker("/src/a.php", src, "$zzz").is_empty());
}

// ─── Parameters ─────────────────────────────────────────────────────────────

#[test]
fn test_docblock_parameter_type_wins() {
    let src = concat!(
        "<?php\n",
        "/** @param \\A\\B $x */\n",
        "function f(C $x) {\n",
        "    /*|*/\n",
        "}\n",
    );
    assert_eq!(deduce_at_marker("/src/a.php", src, "$x"), vec!["\\A\\B"]);
}

#[test]
fn test_parameter_from_hint() {
    let src = concat!(
        "<?php\n",
        "namespace App;\n",
        "use Vendor\\Clock;\n",
        "class Job {\n",
        "    public function run(?Clock $clock, int ...$ids) {\n",
        "        /*|*/\n",
        "    }\n",
        "}\n",
    );
    assert_eq!(
        deduce_at_marker("/src/a.php", src, "$clock"),
        vec!["\\Vendor\\Clock", "null"]
    );
    assert_eq!(deduce_at_marker("/src/a.php", src, "$ids"), vec!["int[]"]);
}

// ─── Members ────────────────────────────────────────────────────────────────

const MODELS: &str = concat!(
    "<?php\n",
    "namespace App;\n",
    "class Repo {\n",
    "    /** @return User[] */\n",
    "    public function all() {}\n",
    "    public function first(): ?User {}\n",
    "}\n",
    "class User {\n",
    "    public Team $team;\n",
    "    public static ?User $current = null;\n",
    "    public function fresh(): static {}\n",
    "}\n",
    "class Team {\n",
    "    const DEFAULT = 'core';\n",
    "    public static function make(): self {}\n",
    "}\n",
    "function make_user(): User {}\n",
    "const LIMIT = 10;\n",
);

fn deduce_in_app(expression: &str) -> Vec<String> {
    let backend = indexed_backend(&[("/src/models.php", MODELS)]);
    let src = concat!(
        "<?php\n",
        "namespace App;\n",
        "$repo = new Repo();\n",
        "/*|*/\n",
        "echo 1;\n",
    );
    deduce_with(&backend, "/src/main.php", src, expression)
}

#[test]
fn test_method_and_property_chains() {
    assert_eq!(deduce_in_app("$repo"), vec!["\\App\\Repo"]);
    assert_eq!(deduce_in_app("$repo->first()"), vec!["\\App\\User", "null"]);
    assert_eq!(deduce_in_app("$repo->first()->team"), vec!["\\App\\Team"]);
    assert_eq!(deduce_in_app("$repo->all()"), vec!["\\App\\User[]"]);
    assert!(deduce_in_app("$repo->missing()").is_empty());
}

#[test]
fn test_static_members_and_constants() {
    assert_eq!(deduce_in_app("Team::make()"), vec!["\\App\\Team"]);
    assert_eq!(deduce_in_app("User::$current"), vec!["\\App\\User", "null"]);
    assert_eq!(deduce_in_app("Team::DEFAULT"), vec!["string"]);
    assert_eq!(deduce_in_app("Team::class"), vec!["string"]);
}

/// `static` in a return type is bound to the classlike the call was made
/// on.
#[test]
fn test_static_return_is_late_bound() {
    assert_eq!(deduce_in_app("(new User())->fresh()"), vec!["\\App\\User"]);
}

#[test]
fn test_nullsafe_access_adds_null() {
    assert_eq!(
        deduce_in_app("$repo->first()?->team"),
        vec!["\\App\\Team", "null"]
    );
}

#[test]
fn test_functions_and_global_constants() {
    assert_eq!(deduce_in_app("make_user()"), vec!["\\App\\User"]);
    assert_eq!(deduce_in_app("LIMIT"), vec!["int"]);
    assert!(deduce_in_app("unknown_function()").is_empty());
}

#[test]
fn test_this_self_and_parent() {
    let src = concat!(
        "<?php\n",
        "namespace Shop;\n",
        "class Box {\n",
        "    public function item(): Item {}\n",
        "}\n",
        "class Crate extends Box {\n",
        "    public function run() {\n",
        "        /*|*/\n",
        "    }\n",
        "}\n",
    );
    let backend = indexed_backend(&[("/src/shop.php", src)]);
    let deduce = |expr: &str| deduce_with(&backend, "/src/shop.php", src, expr);

    assert_eq!(deduce("$this"), vec!["\\Shop\\Crate"]);
    assert_eq!(deduce("$this->item()"), vec!["\\Shop\\Item"]);
    assert_eq!(deduce("new static()"), vec!["\\Shop\\Crate"]);
    assert_eq!(deduce("parent::item()"), vec!["\\Shop\\Item"]);
    assert_eq!(deduce("clone $this"), vec!["\\Shop\\Crate"]);
}

#[test]
fn test_closures_are_closure_objects() {
    let src = "<?php\n$fn = fn() => 1;\n/*|*/\n";
    assert_eq!(deduce_at_marker("/src/a.php", src, "$fn"), vec!["\\Closure"]);
}

// ─── Errors ─────────────────────────────────────────────────────────────────

/// Only expression statements can be deduced.
#[test]
fn test_non_expression_is_unsupported() {
    let backend = indexed_backend(&[]);
    let src = "<?php\n/*|*/\n";
    let err = backend
        .deduce_expression_at("/src/a.php", src, marker_offset(src), "class X {}")
        .expect_err("a class declaration is not an expression");
    assert!(
        matches!(err, NodeError::UnsupportedNode { .. }),
        "got: {:?}",
        err
    );
}
