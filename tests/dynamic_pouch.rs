//! Scenario tests for the closure-backed pouch.

mod common;

use common::{name_of, Food};
use pouch::entity::{assign_by_name, identity_of};
use pouch::{
    Criteria, DynamicPouch, Findable, Insertable, MapPouch, Mergeable, Pouch, PouchError, Query, Record, Storage,
    Tableable, Value,
};
use std::cell::RefCell;
use std::collections::BTreeMap;

type Shelf = RefCell<BTreeMap<i64, String>>;

fn shelf_pouch() -> DynamicPouch<Shelf> {
    let mut shelf = BTreeMap::new();
    shelf.insert(1, "kale".to_string());
    shelf.insert(2, "leek".to_string());
    shelf.insert(3, "okra".to_string());

    DynamicPouch::builder(RefCell::new(shelf))
        .find(|shelf: &Shelf, _criteria: &Criteria, entity: &mut dyn Findable| {
            let (_, ids) = identity_of(&*entity)?;
            let id = ids[0].as_i64().unwrap_or_default();
            let name = shelf
                .borrow()
                .get(&id)
                .cloned()
                .ok_or_else(|| PouchError::NotFound(format!("shelf slot {id}")))?;
            let mut values = BTreeMap::new();
            values.insert("Name".to_string(), Value::from(name));
            assign_by_name(entity, values)?;
            Ok(())
        })
        .find_entities(
            |shelf: &Shelf, criteria: &Criteria, template: &dyn Findable, into: &mut Vec<Box<dyn Findable>>| {
                let names: Vec<String> = shelf.borrow().values().cloned().collect();
                for name in criteria.paginate(names) {
                    let mut copy = template.findable_copy();
                    copy.merge(&mut Record::new(template.table()).with("Name", name))?;
                    into.push(copy);
                }
                Ok(())
            },
        )
        .create(|shelf: &Shelf, entity| {
            let (_, values) = entity.insertable_fields();
            let name = values
                .first()
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let id = shelf.borrow().keys().next_back().copied().unwrap_or(0) + 1;
            shelf.borrow_mut().insert(id, name);
            entity.set_identifier(Value::Int(id))
        })
        .delete(|shelf: &Shelf, entity| {
            let (_, ids) = identity_of(entity)?;
            if let Some(id) = ids[0].as_i64() {
                shelf.borrow_mut().remove(&id);
            }
            Ok(())
        })
        .build()
}

#[test]
fn test_configured_operations_run_their_closures() {
    let pouch = shelf_pouch();

    let mut food = Food::sql(2);
    pouch.find(&mut food).unwrap();
    assert_eq!(food.name, "leek");

    let mut chard = Food::sql(0).named("chard");
    pouch.create(&mut chard).unwrap();
    assert_eq!(chard.id, 4);
    assert_eq!(pouch.backer().borrow().get(&4).map(String::as_str), Some("chard"));

    pouch.delete(&chard).unwrap();
    assert!(pouch.find(&mut Food::sql(4)).unwrap_err().is_not_found());
}

#[test]
fn test_unset_operations_report_not_configured() {
    let pouch = shelf_pouch();
    let food = Food::sql(1);

    let err = pouch.update(&food).unwrap_err();
    assert!(matches!(err, PouchError::NotConfigured("Update")));
    assert_eq!(err.to_string(), "no Update function has been defined");

    assert_eq!(
        pouch.find_all(&mut []).unwrap_err().to_string(),
        "no FindAll function has been defined"
    );
    assert_eq!(
        pouch.create_all(&mut []).unwrap_err().to_string(),
        "no CreateAll function has been defined"
    );
    assert_eq!(
        pouch.delete_all(&[&food]).unwrap_err().to_string(),
        "no DeleteAll function has been defined"
    );
}

#[test]
fn test_empty_builder_configures_nothing() {
    let pouch = DynamicPouch::builder(()).build();
    let err = pouch.find(&mut Food::sql(1)).unwrap_err();
    assert_eq!(err.to_string(), "no Find function has been defined");

    let mut out: Vec<Box<dyn Findable>> = Vec::new();
    let err = pouch.query().find_entities(&Food::sql(0), &mut out).unwrap_err();
    assert_eq!(err.to_string(), "no FindEntities function has been defined");
}

#[test]
fn test_query_criteria_reach_the_closure() {
    let pouch = shelf_pouch();
    let mut out: Vec<Box<dyn Findable>> = Vec::new();
    pouch.offset(1).limit(1).find_entities(&Food::sql(0), &mut out).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(name_of(out[0].as_mut()), Some(Value::from("leek")));
}

#[test]
fn test_backer_can_be_another_pouch() {
    let pouch = DynamicPouch::builder(MapPouch::new())
        .create(|map: &MapPouch, entity| map.create(entity))
        .find(|map: &MapPouch, _criteria: &Criteria, entity: &mut dyn Findable| map.find(entity))
        .build();

    let mut food = Food::map(0).named("squash");
    pouch.create(&mut food).unwrap();

    let mut found = Food::map(food.id);
    pouch.find(&mut found).unwrap();
    assert_eq!(found.name, "squash");
    assert_eq!(pouch.backer().len(), 1);
}
