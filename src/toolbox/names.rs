use std::{collections::HashMap, sync::LazyLock};

/// Toolbox name of an A-line trap word, for diagnostics.
pub fn trap_name(trap: u16) -> Option<&'static str> {
    TRAP_NAMES.get(&trap).copied()
}

fn table() -> HashMap<u16, &'static str> {
    [
        (0xA9E7, "Pack0"),
        (0xA9E8, "Pack1"),
        (0xA9E9, "Pack2"),
        (0xA9EA, "Pack3"),
        (0xA9EB, "FP68K"),     // Pack4
        (0xA9EC, "Elems68K"),  // Pack5
        (0xA9ED, "Pack6"),
        (0xA9EE, "DecStr68K"), // Pack7
        (0xA9EF, "PtrAndHand"),
        (0xA9F0, "LoadSeg"),
        (0xA9F1, "UnloadSeg"),
        (0xA9F4, "ExitToShell"),
        (0xA9F2, "Launch"),
        (0xA9F3, "Chain"),
    ]
    .into_iter()
    .collect()
}

static TRAP_NAMES: LazyLock<HashMap<u16, &'static str>> = LazyLock::new(table);
