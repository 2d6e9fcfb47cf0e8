//! Monster sheet table.
//!
//! Every creature is a sprite sheet laid out one row per facing. Only the
//! first `walk_count` columns of a row form the walk cycle; the rest of the
//! sheet (extra rows or columns on larger sheets) is unused here.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Cardinal facing on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Facing {
    #[default]
    South,
    West,
    East,
    North,
}

impl Facing {
    pub const ALL: [Facing; 4] = [Facing::South, Facing::West, Facing::East, Facing::North];

    pub const fn short(self) -> &'static str {
        match self {
            Facing::South => "s",
            Facing::West => "w",
            Facing::East => "e",
            Facing::North => "n",
        }
    }

    const fn index(self) -> usize {
        match self {
            Facing::South => 0,
            Facing::West => 1,
            Facing::East => 2,
            Facing::North => 3,
        }
    }
}

/// Closed set of creature types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MonsterKind {
    #[default]
    Wolf,
    Vampire,
    Mummy,
    Imp,
    Goblin,
    Golem,
}

impl MonsterKind {
    pub const ALL: [MonsterKind; 6] = [
        MonsterKind::Wolf,
        MonsterKind::Vampire,
        MonsterKind::Mummy,
        MonsterKind::Imp,
        MonsterKind::Goblin,
        MonsterKind::Golem,
    ];

    /// Case-insensitive lookup; anything unknown (or missing) is a wolf.
    pub fn from_key_lossy(key: Option<&str>) -> Self {
        let Some(key) = key else {
            return MonsterKind::default();
        };
        let key = key.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == key)
            .unwrap_or_default()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            MonsterKind::Wolf => "wolf",
            MonsterKind::Vampire => "vampire",
            MonsterKind::Mummy => "mummy",
            MonsterKind::Imp => "imp",
            MonsterKind::Goblin => "goblin",
            MonsterKind::Golem => "golem",
        }
    }

    pub fn def(self) -> &'static MonsterDef {
        match self {
            MonsterKind::Wolf => &WOLF,
            MonsterKind::Vampire => &VAMPIRE,
            MonsterKind::Mummy => &MUMMY,
            MonsterKind::Imp => &IMP,
            MonsterKind::Goblin => &GOBLIN,
            MonsterKind::Golem => &GOLEM,
        }
    }
}

impl fmt::Display for MonsterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static sheet metadata for one creature type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonsterDef {
    pub kind: MonsterKind,
    pub frame_w: u32,
    pub frame_h: u32,
    pub cols: u32,
    pub rows: u32,
    /// Row index per facing, in `Facing` order (s, w, e, n).
    pub facing_rows: [u32; 4],
    pub walk_count: u32,
}

const CARDINAL_ROWS: [u32; 4] = [0, 1, 2, 3];

const fn small_sheet(kind: MonsterKind) -> MonsterDef {
    MonsterDef {
        kind,
        frame_w: 32,
        frame_h: 48,
        cols: 4,
        rows: 4,
        facing_rows: CARDINAL_ROWS,
        walk_count: 4,
    }
}

static WOLF: MonsterDef = small_sheet(MonsterKind::Wolf);
static VAMPIRE: MonsterDef = small_sheet(MonsterKind::Vampire);
static MUMMY: MonsterDef = small_sheet(MonsterKind::Mummy);
static IMP: MonsterDef = MonsterDef {
    kind: MonsterKind::Imp,
    frame_w: 64,
    frame_h: 64,
    cols: 4,
    rows: 4,
    facing_rows: CARDINAL_ROWS,
    walk_count: 4,
};
static GOBLIN: MonsterDef = MonsterDef {
    kind: MonsterKind::Goblin,
    frame_w: 64,
    frame_h: 64,
    cols: 11,
    rows: 5,
    facing_rows: CARDINAL_ROWS,
    walk_count: 6,
};
static GOLEM: MonsterDef = MonsterDef {
    kind: MonsterKind::Golem,
    frame_w: 64,
    frame_h: 64,
    cols: 7,
    rows: 4,
    facing_rows: CARDINAL_ROWS,
    walk_count: 7,
};

impl MonsterDef {
    pub fn row(&self, facing: Facing) -> u32 {
        self.facing_rows[facing.index()]
    }

    /// Frame indices of the walk cycle for a facing.
    pub fn walk_frames(&self, facing: Facing) -> Range<u32> {
        let start = self.row(facing) * self.cols;
        start..start + self.walk_count
    }

    /// Idle pose: first frame of the facing's row.
    pub fn idle_frame(&self, facing: Facing) -> u32 {
        self.row(facing) * self.cols
    }
}

/// Composite animation key, one per (creature, facing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnimKey {
    pub kind: MonsterKind,
    pub facing: Facing,
}

impl AnimKey {
    pub const fn new(kind: MonsterKind, facing: Facing) -> Self {
        Self { kind, facing }
    }
}

impl fmt::Display for AnimKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_walk_{}", self.kind, self.facing.short())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_cycle_fits_in_every_sheet() {
        for kind in MonsterKind::ALL {
            let def = kind.def();
            assert_eq!(def.kind, kind);
            assert!(def.walk_count <= def.cols, "{kind}");
            for facing in Facing::ALL {
                assert!(def.row(facing) < def.rows, "{kind} {facing:?}");
            }
        }
    }

    #[test]
    fn unknown_keys_fall_back_to_wolf() {
        assert_eq!(MonsterKind::from_key_lossy(Some("GOLEM")), MonsterKind::Golem);
        assert_eq!(MonsterKind::from_key_lossy(Some(" imp ")), MonsterKind::Imp);
        assert_eq!(MonsterKind::from_key_lossy(Some("dragon")), MonsterKind::Wolf);
        assert_eq!(MonsterKind::from_key_lossy(None), MonsterKind::Wolf);
    }

    #[test]
    fn goblin_frames_skip_unused_columns() {
        let def = MonsterKind::Goblin.def();
        assert_eq!(def.walk_frames(Facing::West), 11..17);
        assert_eq!(def.idle_frame(Facing::North), 33);
    }

    #[test]
    fn anim_key_display() {
        let key = AnimKey::new(MonsterKind::Mummy, Facing::East);
        assert_eq!(key.to_string(), "mummy_walk_e");
    }
}
