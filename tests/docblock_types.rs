use phpantom_core::docblock::{DocblockType, Tag, parse_docblock};

// ─── Type expressions ───────────────────────────────────────────────────────

/// Unions are spread, `?T` adds null and `T[]` keeps the suffix on every
/// element type.
#[test]
fn test_flatten_union_nullable_and_array() {
    let ty = DocblockType::parse("Foo[]|?\\A\\Bar|int");
    let flat = ty.flatten();
    assert_eq!(flat, vec!["Foo[]", "\\A\\Bar", "null", "int"], "got: {:?}", flat);
}

/// Generic array containers collapse to their element type.
#[test]
fn test_generic_arrays_become_element_arrays() {
    assert_eq!(
        DocblockType::parse("array<int, User>"),
        DocblockType::Array(Box::new(DocblockType::Class("User".to_string())))
    );
    assert_eq!(DocblockType::parse("list<User>").flatten(), vec!["User[]"]);
    // Other generics keep only their base name.
    assert_eq!(
        DocblockType::parse("Collection<int, User>"),
        DocblockType::Class("Collection".to_string())
    );
}

/// Iterable classes keep the type of their values next to themselves.
#[test]
fn test_iterable_classes_keep_their_value_type() {
    assert_eq!(
        DocblockType::parse("\\Traversable<Foo>"),
        DocblockType::Iterable(
            Box::new(DocblockType::Class("\\Traversable".to_string())),
            Box::new(DocblockType::Class("Foo".to_string())),
        )
    );
    assert_eq!(
        DocblockType::parse("Iterator<int, Foo>").flatten(),
        vec!["Iterator", "Foo[]"]
    );
    assert_eq!(
        DocblockType::parse("Generator<int, User, mixed, void>").flatten(),
        vec!["Generator", "User[]"]
    );
    assert_eq!(
        DocblockType::parse("?ArrayObject<User|Admin>").flatten(),
        vec!["ArrayObject", "User[]", "Admin[]", "null"]
    );
}

/// Keyword aliases are canonicalized, specials are lowercased and free
/// text degrades to a keyword instead of failing.
#[test]
fn test_keywords_specials_and_garbage() {
    assert_eq!(DocblockType::parse("integer"), DocblockType::Keyword("int".to_string()));
    assert_eq!(DocblockType::parse("Boolean"), DocblockType::Keyword("bool".to_string()));
    assert_eq!(DocblockType::parse("$this"), DocblockType::Special("$this".to_string()));
    assert_eq!(DocblockType::parse("STATIC"), DocblockType::Special("static".to_string()));
    assert_eq!(DocblockType::parse(""), DocblockType::Special("mixed".to_string()));
    assert_eq!(
        DocblockType::parse("'literal'"),
        DocblockType::Keyword("'literal'".to_string())
    );
}

#[test]
fn test_shapes_and_intersections_reduce_to_their_base() {
    assert_eq!(
        DocblockType::parse("array{id: int, name: string}"),
        DocblockType::Keyword("array".to_string())
    );
    assert_eq!(
        DocblockType::parse("Countable&Traversable"),
        DocblockType::Class("Countable".to_string())
    );
}

/// Serializing a parsed type and parsing it again is stable.
#[test]
fn test_serialization_is_stable() {
    for spec in [
        "(A|null)[]",
        "?Foo",
        "int|string[]|\\A\\B",
        "list<?Foo>",
        "\\Iterator<A|B>",
        "Generator<int, User>",
    ] {
        let once = DocblockType::parse(spec).to_string();
        let twice = DocblockType::parse(&once).to_string();
        assert_eq!(once, twice, "unstable serialization of {spec}");
    }
}

#[test]
fn test_nullability() {
    assert!(DocblockType::parse("?Foo").is_nullable());
    assert!(DocblockType::parse("Foo|null").is_nullable());
    assert!(!DocblockType::parse("Foo|Bar").is_nullable());
}

// ─── Tags ───────────────────────────────────────────────────────────────────

/// The summary is the first paragraph; tags do not leak into it.
#[test]
fn test_description_and_deprecation() {
    let data = parse_docblock(
        concat!(
            "/**\n",
            " * Sends the mail.\n",
            " * Right now.\n",
            " *\n",
            " * Longer text.\n",
            " *\n",
            " * @deprecated use queue()\n",
            " */",
        ),
        Tag::ALL,
        None,
    );
    assert_eq!(data.short_description, "Sends the mail. Right now.");
    assert_eq!(data.long_description, "Longer text.");
    assert!(data.is_deprecated);
}

/// `@param` handles variadics, references and missing types.
#[test]
fn test_param_tags() {
    let data = parse_docblock(
        concat!(
            "/**\n",
            " * @param int|null $a first\n",
            " * @param string ...$rest\n",
            " * @param array &$out\n",
            " * @param $untyped\n",
            " */",
        ),
        &[Tag::Param],
        None,
    );

    let a = data.param("$a").expect("$a documented");
    assert_eq!(a.ty.as_ref().map(DocblockType::flatten), Some(vec!["int".to_string(), "null".to_string()]));
    assert_eq!(a.description, "first");
    assert!(data.param("$rest").is_some_and(|p| p.is_variadic));
    assert!(data.param("$out").is_some_and(|p| p.is_reference));
    assert!(data.param("$untyped").is_some_and(|p| p.ty.is_none()));
}

/// A docblock without `@return` carries no return tag at all.
#[test]
fn test_missing_return_is_not_void() {
    let data = parse_docblock("/** Just text. */", Tag::ALL, None);
    assert!(data.return_tag.is_none());
}

/// `@var` naming another item is ignored when an item name is given.
#[test]
fn test_var_tag_filtering() {
    let text = "/** @var Foo $other */";
    assert!(parse_docblock(text, &[Tag::Var], Some("$mine")).var_tags.is_empty());
    assert_eq!(parse_docblock(text, &[Tag::Var], None).var_tags.len(), 1);

    let unnamed = parse_docblock("/** @var Foo */", &[Tag::Var], Some("$mine"));
    assert!(unnamed.var_for("$mine").is_some());
}

/// Magic members: read/write flags and `@method` signatures.
#[test]
fn test_property_and_method_tags() {
    let data = parse_docblock(
        concat!(
            "/**\n",
            " * @property-read int $id\n",
            " * @property-write string $secret\n",
            " * @method static User find(int $id, bool $strict = false) Looks up\n",
            " * @method save()\n",
            " */",
        ),
        Tag::ALL,
        None,
    );

    let id = &data.properties[0];
    assert_eq!(id.name, "id");
    assert!(id.is_readable && !id.is_writable);
    assert!(!data.properties[1].is_readable && data.properties[1].is_writable);

    let find = &data.methods[0];
    assert!(find.is_static);
    assert_eq!(find.name, "find");
    assert_eq!(find.return_type, Some(DocblockType::Class("User".to_string())));
    assert_eq!(find.parameters.len(), 2);
    assert_eq!(find.parameters[1].default_value.as_deref(), Some("false"));
    assert_eq!(find.description, "Looks up");

    let save = &data.methods[1];
    assert!(!save.is_static && save.return_type.is_none());
}
