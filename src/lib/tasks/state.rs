use std::{collections::HashMap, sync::LazyLock};

use super::types::Status;

static STATE_TRANSITION_MAP: LazyLock<HashMap<Status, Vec<Status>>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    map.insert(Status::Queued, vec![Status::Pulling, Status::Error]);
    map.insert(Status::Pulling, vec![Status::Creating, Status::Error]);
    map.insert(Status::Creating, vec![Status::Starting, Status::Error]);
    map.insert(Status::Starting, vec![Status::Running, Status::Error]);
    map.insert(Status::Running, vec![]);
    map.insert(Status::Error, vec![]);
    map
});

pub fn valid_state_transition(src: &Status, dst: &Status) -> bool {
    if let Some(valid_states) = STATE_TRANSITION_MAP.get(src) {
        valid_states.contains(dst)
    } else {
        false
    }
}
