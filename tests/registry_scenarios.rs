//! End-to-end registry scenarios: sources in, hierarchy and handles out.

use std::sync::Arc;

use gameplay_tags::*;

fn enemy_registry() -> TagRegistry {
    let source = StaticTagSource::from_names("core", ["Enemy.Type.Boss", "Enemy.Type.Normal"]);
    TagRegistry::build(&[&source])
}

#[test]
fn implicit_parents_are_resolvable() {
    let registry = enemy_registry();

    let ty = registry.request_tag("Enemy.Type");
    assert!(ty.is_valid());
    assert!(!registry.definition(ty.id().unwrap()).unwrap().is_explicit());

    let boss = registry.request_tag("Enemy.Type.Boss");
    assert!(ty.is_parent_of(&boss, &registry));
    assert!(boss.is_child_of(&registry.request_tag("Enemy"), &registry));
    assert!(!boss.is_child_of(&boss, &registry));
}

#[test]
fn identities_follow_declaration_order() {
    let registry = enemy_registry();
    let names: Vec<&str> = registry.definitions().iter().map(|d| d.name()).collect();
    assert_eq!(
        names,
        vec!["None", "Enemy", "Enemy.Type", "Enemy.Type.Boss", "Enemy.Type.Normal"]
    );
    assert_eq!(registry.tag_count(), 4);
    assert_eq!(registry.all_tags().count(), 4);
}

#[test]
fn segment_prefix_is_not_ancestry() {
    let source = StaticTagSource::from_names("core", ["A.B", "A.BC"]);
    let registry = TagRegistry::build(&[&source]);
    assert_eq!(registry.is_ancestor_of_path("A.B", "A.BC"), Some(false));
    assert_eq!(registry.is_ancestor_of_path("A", "A.BC"), Some(true));
}

#[test]
fn duplicates_across_sources_keep_the_first() {
    let first = StaticTagSource::new("first").with_tag("Item.Potion", "Heals");
    let second = StaticTagSource::new("second")
        .with_tag("Item.Potion", "Poisons")
        .with_tag("Item.Scroll", "");
    let registry = TagRegistry::build(&[&first, &second]);

    let potion = registry.lookup("Item.Potion").unwrap();
    assert_eq!(potion.description(), "Heals");
    assert_eq!(potion.source_name(), Some("first"));
    assert!(registry.contains("Item.Scroll"));

    assert_eq!(registry.errors().len(), 1);
    let err = &registry.errors()[0];
    assert_eq!(err.tag_name, "Item.Potion");
    assert_eq!(err.source_name.as_deref(), Some("second"));
}

#[test]
fn malformed_names_are_reported_not_registered() {
    let source = StaticTagSource::from_names("bad", ["", ".Lead", "Trail.", "Dou..ble", "None.Child", "Ok"]);
    let registry = TagRegistry::build(&[&source]);

    assert_eq!(registry.errors().len(), 5);
    assert_eq!(registry.tag_count(), 1);
    assert!(registry.contains("Ok"));
}

#[test]
fn request_tag_edge_cases() {
    let registry = enemy_registry();

    assert!(registry.request_tag("").is_none());
    assert!(matches!(registry.request_tag("Enemy.Type.Minion"), GameplayTag::Invalid));
    assert_eq!(registry.request_tag("Enemy.Type.Minion").raw_id(), INVALID_RAW_ID);

    assert!(registry.try_request_tag("Enemy").is_some());
    assert!(registry.try_request_tag("").is_none());
    assert!(registry.try_request_tag("Enemy.Type.Minion").is_none());

    let boss = registry.request_tag("Enemy.Type.Boss");
    assert_eq!(registry.tag_by_id(boss.raw_id()), boss);
    assert!(registry.tag_by_id(999).is_none());
    assert!(registry.tag_by_id(-1).is_none());
    assert_eq!(registry.tag_by_id(-1).raw_id(), 0);
}

#[test]
fn depth_and_parent_chain() {
    let registry = enemy_registry();
    let boss = registry.id_of("Enemy.Type.Boss").unwrap();
    let enemy = registry.id_of("Enemy").unwrap();

    assert_eq!(registry.depth_of(enemy), Some(0));
    assert_eq!(registry.depth_of(boss), Some(2));

    let mut cursor = boss;
    for _ in 0..2 {
        cursor = registry.parent_of(cursor).unwrap();
    }
    assert_eq!(cursor, enemy);
    assert_eq!(registry.parent_of(enemy), None);
}

#[test]
fn toml_database_end_to_end() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("tags.toml");
    std::fs::write(
        &path,
        r#"
[[tags]]
name = "Status.Burning"
description = "On fire"

[[tags]]
name = "Status"
description = "Status effects"
"#,
    )
    .unwrap();

    let source = TomlTagSource::from_file(&path).unwrap();
    assert_eq!(source.len(), 2);

    let registry = Arc::new(TagRegistry::build(&[&source]));
    // Declared after its child, yet keeps its own description
    let status = registry.lookup("Status").unwrap();
    assert_eq!(status.description(), "Status effects");
    assert!(status.is_explicit());
    assert!(status.source_name().unwrap().starts_with("file: "));

    let mut tags = GameplayTagContainer::new(registry.clone());
    tags.add_tag(&GameplayTag::named("Status.Burning"));
    assert!(tags.has_tag_include_children(&registry.request_tag("Status")));
}

#[test]
fn strict_identifiers_config() {
    let config = RegistryConfig::parse("strict_identifiers = true").unwrap();
    let source = StaticTagSource::from_names("core", ["Status.Burning", "Status.on-fire", "9Lives"]);
    let registry = TagRegistry::build_with_config(&[&source], &config);

    assert!(registry.contains("Status.Burning"));
    assert!(!registry.contains("Status.on-fire"));
    assert!(!registry.contains("9Lives"));
    assert_eq!(registry.errors().len(), 2);
}

#[test]
fn handles_deserialize_from_authored_data() {
    #[derive(serde::Deserialize)]
    struct Ability {
        grants: GameplayTag,
        blocked_by: Vec<GameplayTag>,
    }

    let registry = enemy_registry();
    let mut ability: Ability = serde_json::from_str(
        r#"{ "grants": "Enemy.Type.Boss", "blocked_by": ["Enemy", "Enemy.Gone"] }"#,
    )
    .unwrap();

    assert!(ability.grants.is_pending());
    assert!(ability.grants.resolve(&registry) > 0);
    assert!(ability.grants.is_valid());

    let resolved: Vec<i32> = ability
        .blocked_by
        .iter_mut()
        .map(|tag| tag.resolve(&registry))
        .collect();
    assert_eq!(resolved[1], INVALID_RAW_ID);
    assert!(ability.blocked_by[0].is_parent_of(&ability.grants, &registry));
}
