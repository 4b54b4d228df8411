use std::collections::HashMap;

/// Brightness correction lookup from an 8 bit value to a 16 bit drive value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GammaTable {
    table: [u16; 256],
}

impl GammaTable {
    /// `output = round(65535 * (input / 255) ^ gamma)`, with both endpoints
    /// pinned to 0 and 65535.
    pub fn new(gamma: f32) -> GammaTable {
        let mut table = [0u16; 256];
        for (i, entry) in table.iter_mut().enumerate() {
            let x = i as f32 / 255.0;
            *entry = (65535.0 * x.powf(gamma) + 0.5) as u16;
        }
        table[0] = 0;
        table[255] = u16::MAX;
        return GammaTable { table };
    }

    pub fn get(&self, value: u8) -> u16 {
        self.table[value as usize]
    }

    pub fn as_slice(&self) -> &[u16; 256] {
        &self.table
    }
}

/// Memoizes one table per gamma value.
///
/// Owned by whatever performs hardware output and kept for the lifetime of
/// that component. Tables are never evicted; gamma values come from the node
/// configuration, so only a handful ever exist.
#[derive(Debug, Default)]
pub struct GammaCache {
    tables: HashMap<u32, GammaTable>,
}

impl GammaCache {
    pub fn new() -> GammaCache {
        GammaCache::default()
    }

    pub fn get(&mut self, gamma: f32) -> &GammaTable {
        self.tables
            .entry(gamma.to_bits())
            .or_insert_with(|| GammaTable::new(gamma))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
