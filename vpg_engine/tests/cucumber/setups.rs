use cucumber::given;
use vpg_engine::{db_types::SlotId, InventoryManagement};

use crate::cucumber::{kiosk_world::KioskSystem, KioskWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut KioskWorld) {
    let system = KioskSystem::new().await;
    world.system = Some(system);
}

#[given(expr = "slot {word} holds {int} of {int} items")]
async fn slot_holds(world: &mut KioskWorld, slot: String, stock: i64, capacity: i64) {
    world.db().upsert_slot(&SlotId::from(slot), stock, capacity).await.expect("Error setting up slot");
}
