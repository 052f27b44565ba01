// SPDX-License-Identifier: PMPL-1.0-or-later
//
// RDB Codec - Integer bit scrambling
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Encoded-int cells are stored with their bits permuted through a fixed
// 32-entry table. The table is generated by a stride-3 swap walk over the
// identity permutation and never depends on the input. This is obfuscation
// only; it offers no secrecy.

/// Bit `i` of a plain value lands on bit `SCRAMBLE_TABLE[i]` when scrambled.
pub const SCRAMBLE_TABLE: [u8; 32] = build_table();

const fn build_table() -> [u8; 32] {
    let mut table = [0u8; 32];
    let mut i = 0;
    while i < 32 {
        table[i] = i as u8;
        i += 1;
    }

    let mut idx = 3usize;
    let mut i = 0;
    while i < 32 {
        while idx >= 32 {
            idx -= 32;
        }
        let held = table[i];
        table[i] = table[idx];
        table[idx] = held;
        idx += 3 + i;
        i += 1;
    }
    table
}

/// Permute the bits of `value` into their on-disk positions.
pub fn scramble(value: u32) -> u32 {
    let mut out = 0u32;
    for (bit, &target) in SCRAMBLE_TABLE.iter().enumerate() {
        if value & (1 << bit) != 0 {
            out |= 1 << target;
        }
    }
    out
}

/// Undo [`scramble`].
pub fn restore(value: u32) -> u32 {
    let mut out = 0u32;
    for (bit, &source) in SCRAMBLE_TABLE.iter().enumerate() {
        if value & (1 << source) != 0 {
            out |= 1 << bit;
        }
    }
    out
}

/// [`scramble`] over the signed representation used by int32 cells.
pub fn scramble_i32(value: i32) -> i32 {
    scramble(value as u32) as i32
}

/// [`restore`] over the signed representation used by int32 cells.
pub fn restore_i32(value: i32) -> i32 {
    restore(value as u32) as i32
}
