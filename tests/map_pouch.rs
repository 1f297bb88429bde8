//! Scenario tests for the in-memory map pouch.

mod common;

use common::{name_of, Food, MAP_FORMULA};
use fake::faker::lorem::en::Word;
use fake::Fake;
use pouch::{Findable, MapPouch, Pouch, PouchError, Query, Record, Storage, Value};

fn seeded() -> MapPouch {
    MapPouch::with_records([
        ("food:1", Record::new(MAP_FORMULA).with("Name", "map based")),
        ("food:2", Record::new(MAP_FORMULA).with("Name", "kale")),
        ("food:3", Record::new(MAP_FORMULA).with("Name", "spinach")),
    ])
}

#[test]
fn test_find_seeded_entity() {
    let pouch = seeded();
    let mut food = Food::map(1);
    pouch.find(&mut food).unwrap();
    assert_eq!(food.name, "map based");
    assert_eq!(food.id, 1);
}

#[test]
fn test_find_missing_key_is_not_found() {
    let pouch = seeded();
    let err = pouch.find(&mut Food::map(9)).unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("food:9"));
}

#[test]
fn test_find_all_populates_each_entity() {
    let pouch = seeded();
    let (mut m0, mut m1, mut m2) = (Food::map(1), Food::map(2), Food::map(3));
    pouch.find_all(&mut [&mut m0, &mut m1, &mut m2]).unwrap();
    assert_eq!(m0.name, "map based");
    assert_eq!(m1.name, "kale");
    assert_eq!(m2.name, "spinach");
}

#[test]
fn test_limit_only_finds_first_n_entities() {
    let pouch = seeded();
    let (mut m0, mut m1, mut m2) = (Food::map(1), Food::map(2), Food::map(3));
    pouch.limit(2).find_all(&mut [&mut m0, &mut m1, &mut m2]).unwrap();
    assert_eq!(m0.name, "map based");
    assert_eq!(m1.name, "kale");
    assert_eq!(m2.name, "");
}

#[test]
fn test_offset_skips_leading_entities() {
    let pouch = seeded();
    let (mut m0, mut m1, mut m2) = (Food::map(1), Food::map(2), Food::map(3));
    pouch.offset(1).limit(1).find_all(&mut [&mut m0, &mut m1, &mut m2]).unwrap();
    assert_eq!(m0.name, "");
    assert_eq!(m1.name, "kale");
    assert_eq!(m2.name, "");
}

#[test]
fn test_find_all_keeps_going_and_reports_last_error() {
    let pouch = seeded();
    let (mut m0, mut missing, mut m2) = (Food::map(1), Food::map(7), Food::map(3));
    let err = pouch
        .find_all(&mut [&mut m0, &mut missing, &mut m2])
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("food:7"));
    // items after the failure were still attempted
    assert_eq!(m0.name, "map based");
    assert_eq!(m2.name, "spinach");
}

#[test]
fn test_create_assigns_increasing_ids() {
    let pouch = MapPouch::new();
    let mut squash = Food::map(0).named("squash");
    pouch.create(&mut squash).unwrap();
    assert_eq!(squash.id, 0);

    let mut yolo = Food::map(0).named("yolo");
    pouch.create(&mut yolo).unwrap();
    assert_eq!(yolo.id, 1);

    assert_eq!(pouch.keys(), vec!["food:0".to_string(), "food:1".to_string()]);
}

#[test]
fn test_update_then_find() {
    let pouch = MapPouch::new();
    let mut squash = Food::map(0).named("squash");
    pouch.create(&mut squash).unwrap();

    let mut found = Food::map(squash.id);
    pouch.find(&mut found).unwrap();
    assert_eq!(found.name, "squash");

    found.name = "super squash".to_string();
    pouch.update(&found).unwrap();

    let mut again = Food::map(squash.id);
    pouch.find(&mut again).unwrap();
    assert_eq!(again.name, "super squash");
}

#[test]
fn test_update_missing_key_is_refused() {
    let pouch = MapPouch::new();
    let err = pouch.update(&Food::map(4).named("ghost")).unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("refusing to update"));
    assert!(pouch.is_empty());
}

#[test]
fn test_delete_then_find_fails_and_repeat_delete_succeeds() {
    let pouch = MapPouch::new();
    let mut squash = Food::map(0).named("squash");
    pouch.create(&mut squash).unwrap();

    pouch.delete(&squash).unwrap();
    assert!(pouch.find(&mut Food::map(squash.id)).unwrap_err().is_not_found());
    // deleting an absent key is not an error for the map pouch
    pouch.delete(&squash).unwrap();
}

#[test]
fn test_create_find_delete_scenario() {
    let pouch = MapPouch::new();
    let mut spinach = Food::map(0).named("spinach");
    let mut kale = Food::map(0).named("kale");
    pouch.create_all(&mut [&mut spinach, &mut kale]).unwrap();
    assert_eq!((spinach.id, kale.id), (0, 1));

    let mut found = Food::map(0);
    pouch.find(&mut found).unwrap();
    assert_eq!(found.name, "spinach");

    pouch.delete(&spinach).unwrap();
    let err = pouch.find(&mut Food::map(0)).unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("food:0"));
}

#[test]
fn test_bulk_lifecycle() {
    let pouch = MapPouch::new();
    let mut m0 = Food::map(0).named("map based");
    let mut m1 = Food::map(0).named("kale");
    let mut m2 = Food::map(0).named("spinach");
    pouch.create_all(&mut [&mut m0, &mut m1, &mut m2]).unwrap();
    assert_eq!((m0.id, m1.id, m2.id), (0, 1, 2));

    let (mut f0, mut f1, mut f2) = (Food::map(0), Food::map(1), Food::map(2));
    pouch.find_all(&mut [&mut f0, &mut f1, &mut f2]).unwrap();
    assert_eq!(f1.name, "kale");

    f0.name = "map based2".to_string();
    f1.name = "kale2".to_string();
    f2.name = "spinach2".to_string();
    pouch.update_all(&[&f0, &f1, &f2]).unwrap();
    assert_eq!(
        pouch.get("food:2").and_then(|r| r.get("Name").cloned()),
        Some(Value::from("spinach2"))
    );

    pouch.delete_all(&[&f0, &f1, &f2]).unwrap();
    assert!(pouch.is_empty());
    assert!(pouch.find_all(&mut [&mut f0, &mut f1, &mut f2]).is_err());
}

#[test]
fn test_counter_is_shared_across_entity_kinds() {
    let pouch = MapPouch::new();
    let mut food = Food::map(0).named("kale");
    pouch.create(&mut food).unwrap();

    let mut drink = Food {
        table: "drink:%d",
        ..Food::default()
    }
    .named("tea");
    pouch.create(&mut drink).unwrap();

    assert_eq!(food.id, 0);
    assert_eq!(drink.id, 1);
    assert!(pouch.contains_key("drink:1"));
}

#[test]
fn test_find_entities_lists_matching_formula_in_key_order() {
    let pouch = seeded();
    pouch.insert("drink:1", Record::new("drink:%d").with("Name", "tea"));

    let mut out: Vec<Box<dyn Findable>> = Vec::new();
    pouch.query().find_entities(&Food::map(0), &mut out).unwrap();
    let names: Vec<Option<Value>> = out.iter_mut().map(|f| name_of(f.as_mut())).collect();
    assert_eq!(
        names,
        vec![
            Some(Value::from("map based")),
            Some(Value::from("kale")),
            Some(Value::from("spinach")),
        ]
    );
}

#[test]
fn test_find_entities_window_appends() {
    let pouch = seeded();
    let mut out: Vec<Box<dyn Findable>> = vec![Food::map(0).findable_copy()];
    pouch.offset(1).limit(1).find_entities(&Food::map(0), &mut out).unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(name_of(out[1].as_mut()), Some(Value::from("kale")));
}

#[test]
fn test_entity_without_formula_is_contract_error() {
    let pouch = MapPouch::new();
    let err = pouch.create(&mut Food::default().named("x")).unwrap_err();
    assert!(matches!(err, PouchError::Contract(_)));
}

#[test]
fn test_many_generated_entities() {
    let pouch = MapPouch::new();
    let mut foods: Vec<Food> = (0..25)
        .map(|_| Food::map(0).named(&Word().fake::<String>()))
        .collect();
    {
        let mut refs: Vec<&mut dyn pouch::Createable> =
            foods.iter_mut().map(|f| f as &mut dyn pouch::Createable).collect();
        pouch.create_all(&mut refs).unwrap();
    }
    assert_eq!(pouch.len(), 25);
    for (expected, food) in foods.iter().enumerate() {
        assert_eq!(food.id, expected as i64);
        let mut found = Food::map(food.id);
        pouch.find(&mut found).unwrap();
        assert_eq!(found.name, food.name);
    }
}
