// Champion-select session and game-data JSON parsing

use crate::catalog::CatalogEntry;
use crate::lcu::LoadoutTimer;
use log::debug;
use serde_json::Value;

// Locked champion for the local player, from a champ-select session document
pub fn locked_champion_id(session: &Value) -> Option<u32> {
  let local_cell = session.get("localPlayerCellId").and_then(|v| v.as_i64())?;

  let local_actions = || {
    session
      .get("actions")
      .and_then(|v| v.as_array())
      .into_iter()
      .flatten()
      .filter_map(|group| group.as_array())
      .flatten()
      .filter(move |action| action.get("actorCellId").and_then(|v| v.as_i64()) == Some(local_cell))
      .filter(|action| action.get("type").and_then(|v| v.as_str()) == Some("pick"))
  };

  // A pick still in progress is only a hover
  if local_actions().any(|a| a.get("isInProgress").and_then(|v| v.as_bool()).unwrap_or(false)) {
    debug!("[Session] Local pick is in progress; no lock yet");
    return None;
  }

  for action in local_actions() {
    let completed = action.get("completed").and_then(|v| v.as_bool()).unwrap_or(false);
    let champion_id = action.get("championId").and_then(|v| v.as_i64()).unwrap_or(0);
    if completed && champion_id > 0 {
      return Some(champion_id as u32);
    }
  }

  // Instant-assign modes have no pick action; myTeam carries the champion
  let my_team = session.get("myTeam").and_then(|v| v.as_array())?;
  my_team
    .iter()
    .find(|p| p.get("cellId").and_then(|v| v.as_i64()) == Some(local_cell))
    .and_then(|p| p.get("championId").and_then(|v| v.as_i64()))
    .filter(|id| *id > 0)
    .map(|id| id as u32)
}

// Countdown from session.timer; remaining time is aged by how old the
// client's own snapshot is.
pub fn loadout_timer(session: &Value, now_epoch_ms: u64) -> Option<LoadoutTimer> {
  let timer = session.get("timer")?;
  let phase = timer.get("phase").and_then(|v| v.as_str())?.to_string();
  let left = timer
    .get("adjustedTimeLeftInPhase")
    .and_then(|v| v.as_f64())
    .unwrap_or(0.0)
    .max(0.0) as u64;
  let snapshot_ms = timer
    .get("internalNowInEpochMs")
    .and_then(|v| v.as_f64())
    .map(|v| v as u64)
    .unwrap_or(now_epoch_ms);
  let age = now_epoch_ms.saturating_sub(snapshot_ms);

  Some(LoadoutTimer {
    phase,
    remaining_ms: left.saturating_sub(age),
  })
}

pub fn hovered_champion_id(body: &Value) -> Option<u32> {
  body.as_i64().filter(|id| *id > 0).map(|id| id as u32)
}

// CHAMPION_SKIN inventory: item ids the account owns
pub fn owned_cosmetic_ids(inventory: &Value) -> Vec<u32> {
  let items = match inventory.as_array() {
    Some(items) => items,
    None => return Vec::new(),
  };

  items
    .iter()
    .filter(|item| {
      item.get("owned").and_then(|v| v.as_bool()).unwrap_or(false)
        || item.get("ownershipType").and_then(|v| v.as_str()) == Some("OWNED")
    })
    .filter_map(|item| item.get("itemId").and_then(|v| v.as_u64()))
    .map(|id| id as u32)
    .collect()
}

// Champion game-data document: skins followed by their chromas, in order
pub fn catalog_entries(champion: &Value) -> Vec<CatalogEntry> {
  let mut entries = Vec::new();
  let skins = match champion.get("skins").and_then(|v| v.as_array()) {
    Some(skins) => skins,
    None => return entries,
  };

  for skin in skins {
    let (Some(id), Some(name)) = (
      skin.get("id").and_then(|v| v.as_u64()),
      skin.get("name").and_then(|v| v.as_str()),
    ) else {
      continue;
    };
    let skin_id = id as u32;
    entries.push(CatalogEntry::new(skin_id, name));

    for chroma in skin.get("chromas").and_then(|v| v.as_array()).into_iter().flatten() {
      if let (Some(cid), Some(cname)) = (
        chroma.get("id").and_then(|v| v.as_u64()),
        chroma.get("name").and_then(|v| v.as_str()),
      ) {
        entries.push(CatalogEntry::chroma(cid as u32, cname, skin_id));
      }
    }
  }
  entries
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn completed_pick_is_a_lock() {
    let session = json!({
      "localPlayerCellId": 2,
      "actions": [[
        {"actorCellId": 1, "type": "pick", "championId": 64, "completed": true},
        {"actorCellId": 2, "type": "pick", "championId": 157, "completed": true, "isInProgress": false}
      ]]
    });
    assert_eq!(locked_champion_id(&session), Some(157));
  }

  #[test]
  fn pick_in_progress_is_not_a_lock() {
    let session = json!({
      "localPlayerCellId": 2,
      "actions": [[{"actorCellId": 2, "type": "pick", "championId": 157, "completed": false, "isInProgress": true}]],
      "myTeam": [{"cellId": 2, "championId": 157}]
    });
    assert_eq!(locked_champion_id(&session), None);
  }

  #[test]
  fn instant_assign_falls_back_to_my_team() {
    let session = json!({
      "localPlayerCellId": 0,
      "actions": [],
      "myTeam": [{"cellId": 0, "championId": 22}]
    });
    assert_eq!(locked_champion_id(&session), Some(22));
  }

  #[test]
  fn timer_is_aged_by_snapshot_time() {
    let session = json!({
      "timer": {"phase": "FINALIZATION", "adjustedTimeLeftInPhase": 5000, "internalNowInEpochMs": 1_000_000}
    });
    let timer = loadout_timer(&session, 1_000_400).unwrap();
    assert!(timer.is_finalization());
    assert_eq!(timer.remaining_ms, 4600);
  }

  #[test]
  fn inventory_keeps_owned_items_only() {
    let inventory = json!([
      {"itemId": 157000, "ownershipType": "OWNED"},
      {"itemId": 157002, "ownershipType": "RENTED", "owned": false},
      {"itemId": 157003, "owned": true}
    ]);
    assert_eq!(owned_cosmetic_ids(&inventory), vec![157000, 157003]);
  }

  #[test]
  fn catalog_lists_chromas_after_their_skin() {
    let doc = json!({
      "skins": [
        {"id": 157000, "name": "Yasuo"},
        {"id": 157002, "name": "High Noon Yasuo", "chromas": [{"id": 157003, "name": "High Noon Yasuo (Ruby)"}]}
      ]
    });
    let entries = catalog_entries(&doc);
    let ids: Vec<u32> = entries.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![157000, 157002, 157003]);
    assert_eq!(entries[2].parent_id, Some(157002));
  }
}
