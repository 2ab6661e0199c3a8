//! End-to-end scenarios for the Warden tool engine.
//!
//! Each test wires a real store, dispatch queue, and gateway together the
//! way the engine binary does, then checks an observable property of the
//! whole pipeline: filter precedence, idempotent mutation, FIFO dispatch
//! across threads, fault isolation, and region guards.

// Integration tests use unwrap extensively for clarity -- panicking on
// failure is the correct behavior in test code.
#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::panic)]

use std::sync::{Arc, mpsc};
use std::thread;

use serde_json::{Value, json};
use warden_core::config::{GatewayConfig, HostConfig};
use warden_core::dispatch::{DispatchError, DispatchQueue, TaskState};
use warden_core::filter::FilterSpec;
use warden_core::gateway::ToolGateway;
use warden_core::host::{HostControl, HostEndReason, SimulationHost};
use warden_core::json as payload;
use warden_core::resolver;
use warden_core::tools::{self, ToolRequest};
use warden_types::{Cell, DefTrait, EntityId, ThingCategory, ThingDef};
use warden_world::{EntityStore, StartingWorldSpec, ThingMap, create_starting_world};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// One sword (forbiddable, allowed), one shirt, a steel stack, and a wall.
fn armory() -> ThingMap {
    let mut map = ThingMap::new(60, 60);
    for def in warden_world::standard_defs() {
        map.register_def(def);
    }
    map.spawn("MeleeWeapon_LongSword", Cell::new(10, 10), 1).unwrap();
    map.spawn("Apparel_BasicShirt", Cell::new(12, 10), 1).unwrap();
    map.spawn("Steel", Cell::new(3, 3), 40).unwrap();
    map.spawn("Wall", Cell::new(4, 4), 1).unwrap();
    map
}

fn eligible_ids(store: &dyn EntityStore) -> Vec<EntityId> {
    store
        .things()
        .filter(|thing| store.is_eligible(thing))
        .map(|thing| thing.id)
        .collect()
}

fn call(store: &mut ThingMap, action: &str, args: Value) -> Value {
    tools::execute(store, &ToolRequest::new(action, args))
}

// ---------------------------------------------------------------------------
// Filter precedence and presence
// ---------------------------------------------------------------------------

#[test]
fn ids_always_win_over_type() {
    let map = armory();
    let payloads = [
        json!({"ids": [1], "type": "Steel"}),
        json!({"ids": [1], "def_name": "Steel", "category": "resources"}),
        json!({"ids": [1], "type": "Steel", "x1": 0, "z1": 0, "x2": 5, "z2": 5}),
        json!({"ids": "[1]", "type": "Apparel_BasicShirt"}),
    ];
    for args in payloads {
        let resolution = resolver::resolve(&FilterSpec::parse(&args), &map).unwrap();
        assert_eq!(resolution.mode.kind(), "ids", "payload {args}");
        assert_eq!(resolution.targets, vec![EntityId(1)]);
    }
}

#[test]
fn no_recognised_key_targets_every_eligible_entity() {
    let map = create_starting_world(&StartingWorldSpec::default()).unwrap();
    for args in [json!({}), json!({"allowed": true}), json!({"colour": "red"})] {
        let resolution = resolver::resolve(&FilterSpec::parse(&args), &map).unwrap();
        assert_eq!(resolution.mode.to_string(), "all");
        assert_eq!(resolution.targets, eligible_ids(&map));
    }
}

#[test]
fn absent_keys_are_absent() {
    let empty = json!({});
    assert!(!payload::has_key(&empty, "x"));
    assert!(payload::get(&empty, "x").is_none());
    // A single coordinate never activates the region branch.
    assert_eq!(FilterSpec::parse(&json!({"z": 4})), FilterSpec::All);
}

#[test]
fn region_corners_are_order_independent() {
    let map = armory();
    let forward = FilterSpec::parse(&json!({"x1": 2, "z1": 2, "x2": 5, "z2": 5}));
    let backward = FilterSpec::parse(&json!({"x1": 5, "z1": 5, "x2": 2, "z2": 2}));
    assert_eq!(forward, backward);
    let a = resolver::resolve(&forward, &map).unwrap();
    let b = resolver::resolve(&backward, &map).unwrap();
    assert_eq!(a.targets, b.targets);
    // Steel only; the wall in range is not eligible.
    assert_eq!(a.targets, vec![EntityId(3)]);
}

// ---------------------------------------------------------------------------
// Mutation
// ---------------------------------------------------------------------------

#[test]
fn forbidding_weapons_touches_only_the_sword() {
    let mut map = armory();
    let result = call(
        &mut map,
        "set_item_allowed",
        json!({"category": "weapons", "allowed": false}),
    );
    assert_eq!(result["targeting_mode"], json!("category:weapons"));
    assert_eq!(result["changed"], json!(1));
    assert_eq!(result["already_correct"], json!(0));
    assert_eq!(result["total_matched"], json!(1));

    assert!(map.thing(EntityId(1)).unwrap().forbidden);
    assert!(!map.thing(EntityId(2)).unwrap().forbidden);
}

#[test]
fn repeating_a_mutation_changes_nothing() {
    let mut map = create_starting_world(&StartingWorldSpec::default()).unwrap();
    let args = json!({"category": "resources", "allowed": true});

    let first = call(&mut map, "set_item_allowed", args.clone());
    assert!(first.get("error").is_none());

    let second = call(&mut map, "set_item_allowed", args);
    assert_eq!(second["changed"], json!(0));
    assert_eq!(second["already_correct"], second["total_matched"]);
    assert!(second.get("examples").is_none());
}

#[test]
fn oversized_region_is_rejected_before_resolution() {
    let mut map = armory();
    let result = call(
        &mut map,
        "set_item_allowed",
        json!({"x1": 0, "z1": 0, "x2": 50, "z2": 50, "allowed": false}),
    );
    assert_eq!(
        result,
        json!({"error": "Too many cells (2601). Maximum 2500 cells per call (50x50)."})
    );
    assert!(map.things().all(|thing| !thing.forbidden));
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

#[test]
fn dispatch_is_fifo_across_threads() {
    let queue: Arc<DispatchQueue<Vec<&'static str>>> = Arc::new(DispatchQueue::new());
    let (to_b, b_turn) = mpsc::channel::<()>();
    let (to_c, c_turn) = mpsc::channel::<()>();

    let a = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            let seq = queue.enqueue(|log: &mut Vec<&'static str>| log.push("A")).seq();
            to_b.send(()).unwrap();
            seq
        })
    };
    let b = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            b_turn.recv().unwrap();
            let seq = queue.enqueue(|log: &mut Vec<&'static str>| log.push("B")).seq();
            to_c.send(()).unwrap();
            seq
        })
    };
    let c = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            c_turn.recv().unwrap();
            queue.enqueue(|log: &mut Vec<&'static str>| log.push("C")).seq()
        })
    };
    let seqs = [a.join().unwrap(), b.join().unwrap(), c.join().unwrap()];
    assert!(seqs[0] < seqs[1] && seqs[1] < seqs[2]);

    let mut log = Vec::new();
    assert_eq!(queue.drain_all(&mut log).ran, 3);
    assert_eq!(log, vec!["A", "B", "C"]);
}

#[test]
fn a_faulting_task_does_not_abort_tool_calls_in_the_same_drain() {
    let queue: Arc<DispatchQueue<ThingMap>> = Arc::new(DispatchQueue::new());
    let gateway = ToolGateway::new(Arc::clone(&queue), None);

    let fault = queue.enqueue(|_: &mut ThingMap| -> Value { panic!("corrupt def") });
    let caller = thread::spawn(move || {
        gateway.call_blocking(&ToolRequest::new(
            "set_item_allowed",
            json!({"type": "Steel", "allowed": false}),
        ))
    });
    while queue.len() < 2 {
        thread::yield_now();
    }

    let mut map = armory();
    let report = queue.drain_all(&mut map);
    assert_eq!((report.ran, report.failed), (2, 1));

    assert_eq!(fault.state(), TaskState::Failed);
    assert!(matches!(
        fault.wait_blocking(),
        Err(DispatchError::Panicked { message }) if message == "corrupt def"
    ));
    let result = caller.join().unwrap();
    assert_eq!(result["changed"], json!(1));
    assert!(map.thing(EntityId(3)).unwrap().forbidden);
}

#[test]
fn work_queued_after_shutdown_is_abandoned() {
    let host = SimulationHost::new(armory(), &GatewayConfig::default());
    let gateway = host.gateway();
    let control = Arc::new(HostControl::new(&HostConfig {
        tick_interval_ms: 1,
        max_ticks: 0,
    }));
    let sim = host.spawn(Arc::clone(&control)).unwrap();
    control.request_stop();
    let (summary, store) = sim.join().unwrap();
    assert_eq!(summary.end_reason, HostEndReason::StopRequested);

    // The gateway is still alive; its calls resolve instead of hanging.
    let result = gateway.call_blocking(&ToolRequest::new(
        "set_item_allowed",
        json!({"type": "Steel", "allowed": false}),
    ));
    assert_eq!(
        result,
        json!({"error": "Tool execution failed: task abandoned before it ran"})
    );
    assert!(!store.thing(EntityId(3)).unwrap().forbidden);
}

// ---------------------------------------------------------------------------
// Full pipeline on the simulation thread
// ---------------------------------------------------------------------------

#[tokio::test]
async fn controller_round_trip_through_the_host_thread() {
    let world = create_starting_world(&StartingWorldSpec::default()).unwrap();
    let host = SimulationHost::new(world, &GatewayConfig::default());
    let gateway = host.gateway();
    let control = Arc::new(HostControl::new(&HostConfig {
        tick_interval_ms: 1,
        max_ticks: 0,
    }));
    let sim = host.spawn(Arc::clone(&control)).unwrap();

    let forbid = gateway
        .call(ToolRequest::new(
            "set_item_allowed",
            json!({"category": "medicine", "allowed": false}),
        ))
        .await;
    assert!(forbid.get("error").is_none(), "{forbid}");
    assert_eq!(forbid["targeting_mode"], json!("category:medicine"));

    let listed = gateway
        .call(ToolRequest::new("get_forbidden_items", json!({"category": "medicine"})))
        .await;
    assert_eq!(listed["count"], forbid["total_matched"]);

    let miss = gateway
        .call(ToolRequest::new("list_items", json!({"type": "unobtainium"})))
        .await;
    assert!(miss["error"].as_str().unwrap().contains("Available:"));

    let unknown = gateway.call(ToolRequest::new("launch_ship", json!({}))).await;
    assert_eq!(unknown, json!({"error": "Unknown tool: launch_ship"}));

    control.request_stop();
    let (summary, _store) = sim.join().unwrap();
    assert_eq!(summary.end_reason, HostEndReason::StopRequested);
    assert_eq!(summary.tasks_failed, 0);
    assert!(summary.tasks_run >= 3);
}

#[test]
fn forbiddable_capability_is_reported_not_probed() {
    let mut map = ThingMap::new(10, 10);
    map.register_def(
        ThingDef::new("ChunkGranite", "granite chunk", ThingCategory::Item).with(DefTrait::Haulable),
    );
    map.spawn("ChunkGranite", Cell::new(1, 1), 1).unwrap();
    let result = call(&mut map, "set_item_allowed", json!({"allowed": false}));
    assert_eq!(result["not_forbiddable"], json!(1));
    assert_eq!(result["changed"], json!(0));
}
