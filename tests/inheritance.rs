mod common;

use common::indexed_backend;
use phpantom_core::errors::ResolutionError;
use phpantom_core::{FlattenedClasslikeInfo, MemberOrigin, Visibility};

fn resolve(files: &[(&str, &str)], fqcn: &str) -> FlattenedClasslikeInfo {
    indexed_backend(files)
        .resolve_classlike(fqcn)
        .unwrap_or_else(|err| panic!("resolving {fqcn} failed: {err}"))
}

fn method_owner(info: &FlattenedClasslikeInfo, name: &str) -> String {
    info.method(name)
        .unwrap_or_else(|| panic!("method {name} missing on {}", info.fqcn()))
        .member
        .declaring_fqcn
        .clone()
}

// ─── Precedence ─────────────────────────────────────────────────────────────

/// Own members beat traits, traits beat the parent chain, the parent
/// chain beats interfaces.
#[test]
fn test_member_precedence() {
    let info = resolve(
        &[(
            "/src/precedence.php",
            concat!(
                "<?php\n",
                "interface I { public function m(); public function fromInterface(); }\n",
                "class P { public function m() {} public function own() {} public function fromParent() {} }\n",
                "trait T { public function m() {} public function own() {} }\n",
                "class C extends P implements I {\n",
                "    use T;\n",
                "    public function own() {}\n",
                "}\n",
            ),
        )],
        "\\C",
    );

    assert_eq!(method_owner(&info, "own"), "\\C");
    assert_eq!(method_owner(&info, "m"), "\\T");
    assert_eq!(method_owner(&info, "fromParent"), "\\P");
    assert_eq!(method_owner(&info, "fromInterface"), "\\I");

    let own = info.method("own").expect("own");
    assert_eq!(own.origin, MemberOrigin::Own);
    assert_eq!(own.overrides.as_deref(), Some("\\T"));
    assert_eq!(info.method("m").map(|m| m.origin), Some(MemberOrigin::Inherited));

    let names: Vec<&str> = info.methods.iter().map(|m| m.member.name.as_str()).collect();
    assert_eq!(names.len(), 4, "no duplicates expected, got: {:?}", names);
}

#[test]
fn test_ancestor_lists() {
    let info = resolve(
        &[(
            "/src/chain.php",
            concat!(
                "<?php\n",
                "namespace App;\n",
                "interface Base {}\n",
                "interface Named extends Base {}\n",
                "trait Loud {}\n",
                "class A implements Named { use Loud; }\n",
                "class B extends A {}\n",
                "class C extends B implements \\Countable {}\n",
            ),
        )],
        "\\App\\C",
    );

    assert_eq!(info.parents, vec!["\\App\\B", "\\App\\A"]);
    assert_eq!(
        info.interfaces,
        vec!["\\App\\Named", "\\App\\Base", "\\Countable"],
        "got: {:?}",
        info.interfaces
    );
    assert_eq!(info.traits, vec!["\\App\\Loud"]);
    assert!(info.is_subtype_of("\\app\\base"));
    assert!(!info.is_subtype_of("\\App\\Loud"));
}

// ─── Traits ─────────────────────────────────────────────────────────────────

/// `insteadof` picks the winner regardless of the order of the `use` list.
#[test]
fn test_trait_insteadof() {
    let info = resolve(
        &[(
            "/src/traits.php",
            concat!(
                "<?php\n",
                "trait T1 { public function m() {} }\n",
                "trait T2 { public function m() {} }\n",
                "class C {\n",
                "    use T2, T1 { T1::m insteadof T2; }\n",
                "}\n",
            ),
        )],
        "\\C",
    );
    assert_eq!(method_owner(&info, "m"), "\\T1");
    assert_eq!(info.traits, vec!["\\T2", "\\T1"]);
}

/// Without adaptations the trait listed first wins.
#[test]
fn test_first_trait_wins() {
    let info = resolve(
        &[(
            "/src/traits.php",
            concat!(
                "<?php\n",
                "trait T1 { public function m() {} }\n",
                "trait T2 { public function m() {} }\n",
                "class C { use T2, T1; }\n",
            ),
        )],
        "\\C",
    );
    assert_eq!(method_owner(&info, "m"), "\\T2");
}

#[test]
fn test_trait_aliases() {
    let info = resolve(
        &[(
            "/src/alias.php",
            concat!(
                "<?php\n",
                "trait Greets {\n",
                "    public function hello() {}\n",
                "    public function bye() {}\n",
                "}\n",
                "class C {\n",
                "    use Greets {\n",
                "        hello as protected greet;\n",
                "        bye as private;\n",
                "    }\n",
                "}\n",
            ),
        )],
        "\\C",
    );

    let greet = info.method("greet").expect("alias published");
    assert_eq!(greet.member.visibility, Visibility::Protected);
    assert_eq!(greet.member.declaring_fqcn, "\\Greets");
    // The original name stays available.
    assert_eq!(
        info.method("hello").map(|m| m.member.visibility),
        Some(Visibility::Public)
    );
    assert_eq!(
        info.method("bye").map(|m| m.member.visibility),
        Some(Visibility::Private)
    );
}

/// Trait members are copied into the class, private ones included.
#[test]
fn test_private_trait_members_are_kept() {
    let info = resolve(
        &[(
            "/src/private_trait.php",
            concat!(
                "<?php\n",
                "trait Helpers {\n",
                "    private $cache;\n",
                "    private function helper() {}\n",
                "}\n",
                "class C { use Helpers; }\n",
            ),
        )],
        "\\C",
    );
    assert!(info.method("helper").is_some());
    assert!(info.property("cache").is_some());
}

// ─── Parents and interfaces ─────────────────────────────────────────────────

#[test]
fn test_private_parent_members_are_skipped() {
    let info = resolve(
        &[(
            "/src/private_parent.php",
            concat!(
                "<?php\n",
                "class P {\n",
                "    private const SECRET = 1;\n",
                "    private $hidden;\n",
                "    protected $shared;\n",
                "    private function secret() {}\n",
                "}\n",
                "class C extends P {}\n",
            ),
        )],
        "\\C",
    );
    assert!(info.method("secret").is_none());
    assert!(info.property("hidden").is_none());
    assert!(info.constant("SECRET").is_none());
    assert!(info.property("$shared").is_some());
}

/// Overriding a parent method records the shadowed declaration.
#[test]
fn test_overrides_are_recorded() {
    let info = resolve(
        &[(
            "/src/override.php",
            concat!(
                "<?php\n",
                "class A { public function run() {} }\n",
                "class B extends A {}\n",
                "class C extends B { public function run() {} }\n",
            ),
        )],
        "\\C",
    );
    let run = info.method("run").expect("run");
    assert_eq!(run.member.declaring_fqcn, "\\C");
    assert_eq!(run.overrides.as_deref(), Some("\\A"));
}

#[test]
fn test_inherit_doc_takes_ancestor_text() {
    let info = resolve(
        &[(
            "/src/inherit_doc.php",
            concat!(
                "<?php\n",
                "interface Runner {\n",
                "    /** Runs the job. */\n",
                "    public function run();\n",
                "}\n",
                "class Base {\n",
                "    /** Stops the job. */\n",
                "    public function stop() {}\n",
                "}\n",
                "class Job extends Base implements Runner {\n",
                "    /** {@inheritDoc} */\n",
                "    public function run() {}\n",
                "    /** @inheritdoc */\n",
                "    public function stop() {}\n",
                "    /** Own words. */\n",
                "    public function pause() {}\n",
                "}\n",
            ),
        )],
        "\\Job",
    );
    let doc = |name: &str| {
        info.method(name)
            .map(|m| m.member.documentation.short_description.clone())
            .unwrap_or_default()
    };
    assert_eq!(doc("run"), "Runs the job.");
    assert_eq!(doc("stop"), "Stops the job.");
    assert_eq!(doc("pause"), "Own words.");
    assert_eq!(method_owner(&info, "run"), "\\Job");
}

/// The same constant from two unrelated interfaces is kept twice; an own
/// constant hides them.
#[test]
fn test_interface_constants_are_unioned() {
    let files = [(
        "/src/constants.php",
        concat!(
            "<?php\n",
            "interface I1 { const LIMIT = 1; }\n",
            "interface I2 { const LIMIT = 2; }\n",
            "class Both implements I1, I2 {}\n",
            "class Own implements I1, I2 { const LIMIT = 3; }\n",
        ),
    )];
    let backend = indexed_backend(&files);

    let both = backend.resolve_classlike("\\Both").expect("Both resolves");
    let owners: Vec<&str> = both
        .constants
        .iter()
        .filter(|c| c.member.name == "LIMIT")
        .map(|c| c.member.declaring_fqcn.as_str())
        .collect();
    assert_eq!(owners, vec!["\\I1", "\\I2"]);

    let own = backend.resolve_classlike("\\Own").expect("Own resolves");
    assert_eq!(own.constants.len(), 1, "got: {:?}", own.constants);
    assert_eq!(own.constants[0].member.declaring_fqcn, "\\Own");
}

/// An interface extending several interfaces unions their constants, and
/// the union survives into implementers and subclasses.
#[test]
fn test_extended_interface_constants_are_unioned() {
    let files = [(
        "/src/extended.php",
        concat!(
            "<?php\n",
            "namespace N;\n",
            "interface J { const X = 1; }\n",
            "interface K { const X = 2; }\n",
            "interface I extends J, K {}\n",
            "interface Own extends J, K { const X = 3; }\n",
            "class D implements I {}\n",
            "class E extends D {}\n",
        ),
    )];
    let backend = indexed_backend(&files);
    let owners = |fqcn: &str| -> Vec<String> {
        backend
            .resolve_classlike(fqcn)
            .unwrap_or_else(|err| panic!("resolving {fqcn} failed: {err}"))
            .constants
            .iter()
            .filter(|c| c.member.name == "X")
            .map(|c| c.member.declaring_fqcn.clone())
            .collect()
    };

    assert_eq!(owners("\\N\\I"), vec!["\\N\\J", "\\N\\K"]);
    assert_eq!(owners("\\N\\D"), vec!["\\N\\J", "\\N\\K"]);
    assert_eq!(owners("\\N\\E"), vec!["\\N\\J", "\\N\\K"]);
    assert_eq!(owners("\\N\\Own"), vec!["\\N\\Own"]);
}

/// Magic members of a parent are inherited like declared ones.
#[test]
fn test_magic_members_are_inherited() {
    let info = resolve(
        &[(
            "/src/magic.php",
            concat!(
                "<?php\n",
                "/**\n",
                " * @property string $title\n",
                " * @method static static make()\n",
                " */\n",
                "class Model {}\n",
                "class Post extends Model {}\n",
            ),
        )],
        "\\Post",
    );
    assert!(info.property("title").is_some_and(|p| p.member.is_magic));
    assert!(info.method("make").is_some_and(|m| m.member.is_static));
}

// ─── Failures ───────────────────────────────────────────────────────────────

#[test]
fn test_unknown_classlike() {
    let backend = indexed_backend(&[]);
    let err = backend
        .resolve_classlike("\\Nope")
        .expect_err("nothing is indexed");
    assert_eq!(err, ResolutionError::UnknownClasslike("\\Nope".to_string()));
}

/// Unknown ancestors are listed but contribute no members.
#[test]
fn test_unknown_ancestors_are_skipped() {
    let info = resolve(
        &[(
            "/src/orphan.php",
            "<?php\nclass C extends Missing implements Gone { public function m() {} }\n",
        )],
        "\\C",
    );
    assert_eq!(info.parents, vec!["\\Missing"]);
    assert_eq!(info.interfaces, vec!["\\Gone"]);
    assert_eq!(info.methods.len(), 1);
}

#[test]
fn test_parent_cycle_is_detected() {
    let backend = indexed_backend(&[(
        "/src/cycle.php",
        "<?php\nclass A extends B {}\nclass B extends A {}\n",
    )]);
    match backend.resolve_classlike("\\A") {
        Err(ResolutionError::CircularDependency { fqcn, chain }) => {
            assert_eq!(fqcn, "\\A");
            assert_eq!(chain, vec!["\\A", "\\B", "\\A"]);
        }
        other => panic!("expected a circular dependency, got: {:?}", other),
    }
}

#[test]
fn test_trait_cycle_is_detected() {
    let backend = indexed_backend(&[(
        "/src/trait_cycle.php",
        concat!(
            "<?php\n",
            "trait X { use Y; }\n",
            "trait Y { use X; }\n",
            "class Z { use X; }\n",
        ),
    )]);
    let err = backend.resolve_classlike("\\Z").expect_err("X and Y use each other");
    assert!(
        matches!(err, ResolutionError::CircularDependency { .. }),
        "got: {:?}",
        err
    );
}
