//! Carbon and nitrogen pools of a site.

use crate::FloatValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Index, IndexMut};

/// Carbon and nitrogen held by one pool (g/m²).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pool {
    pub carbon: FloatValue,
    pub nitrogen: FloatValue,
    /// Intrinsic decay rate (yr⁻¹), zero for pools that do not decompose.
    pub decay_rate: FloatValue,
    /// Lignin share of the carbon, only meaningful for structural and wood pools.
    pub lignin_fraction: FloatValue,
}

impl Pool {
    pub fn new(carbon: FloatValue, nitrogen: FloatValue) -> Self {
        Self {
            carbon,
            nitrogen,
            ..Default::default()
        }
    }

    /// C:N ratio, `None` while the pool holds no nitrogen.
    pub fn cn_ratio(&self) -> Option<FloatValue> {
        if self.nitrogen > 0.0 {
            Some(self.carbon / self.nitrogen)
        } else {
            None
        }
    }

    pub fn totals(&self) -> ElementTotals {
        ElementTotals {
            carbon: self.carbon,
            nitrogen: self.nitrogen,
        }
    }
}

/// Soil horizon a pool belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layer {
    Surface,
    Soil,
}

/// The named decomposable pools of a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoolKind {
    SurfaceStructural,
    SurfaceMetabolic,
    SoilStructural,
    SoilMetabolic,
    SurfaceDeadWood,
    SoilDeadWood,
    Som1Surface,
    Som1Soil,
    Som2,
    Som3,
}

impl PoolKind {
    pub const ALL: [PoolKind; 10] = [
        PoolKind::SurfaceStructural,
        PoolKind::SurfaceMetabolic,
        PoolKind::SoilStructural,
        PoolKind::SoilMetabolic,
        PoolKind::SurfaceDeadWood,
        PoolKind::SoilDeadWood,
        PoolKind::Som1Surface,
        PoolKind::Som1Soil,
        PoolKind::Som2,
        PoolKind::Som3,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn layer(self) -> Layer {
        match self {
            PoolKind::SurfaceStructural
            | PoolKind::SurfaceMetabolic
            | PoolKind::SurfaceDeadWood
            | PoolKind::Som1Surface => Layer::Surface,
            _ => Layer::Soil,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PoolKind::SurfaceStructural => "surface structural litter",
            PoolKind::SurfaceMetabolic => "surface metabolic litter",
            PoolKind::SoilStructural => "soil structural litter",
            PoolKind::SoilMetabolic => "soil metabolic litter",
            PoolKind::SurfaceDeadWood => "surface dead wood",
            PoolKind::SoilDeadWood => "soil dead wood",
            PoolKind::Som1Surface => "SOM1 surface",
            PoolKind::Som1Soil => "SOM1 soil",
            PoolKind::Som2 => "SOM2",
            PoolKind::Som3 => "SOM3",
        }
    }

    pub fn structural(layer: Layer) -> Self {
        match layer {
            Layer::Surface => PoolKind::SurfaceStructural,
            Layer::Soil => PoolKind::SoilStructural,
        }
    }

    pub fn metabolic(layer: Layer) -> Self {
        match layer {
            Layer::Surface => PoolKind::SurfaceMetabolic,
            Layer::Soil => PoolKind::SoilMetabolic,
        }
    }

    pub fn dead_wood(layer: Layer) -> Self {
        match layer {
            Layer::Surface => PoolKind::SurfaceDeadWood,
            Layer::Soil => PoolKind::SoilDeadWood,
        }
    }

    pub fn som1(layer: Layer) -> Self {
        match layer {
            Layer::Surface => PoolKind::Som1Surface,
            Layer::Soil => PoolKind::Som1Soil,
        }
    }
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fixed set of decomposable pools, indexed by [`PoolKind`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SoilPools {
    pools: [Pool; 10],
}

impl SoilPools {
    pub fn iter(&self) -> impl Iterator<Item = (PoolKind, &Pool)> {
        PoolKind::ALL.iter().map(move |kind| (*kind, &self.pools[kind.index()]))
    }

    pub fn totals(&self) -> ElementTotals {
        self.pools.iter().map(Pool::totals).fold(ElementTotals::default(), Add::add)
    }

    pub fn totals_of(&self, kinds: &[PoolKind]) -> ElementTotals {
        kinds
            .iter()
            .map(|kind| self[*kind].totals())
            .fold(ElementTotals::default(), Add::add)
    }
}

impl Index<PoolKind> for SoilPools {
    type Output = Pool;

    fn index(&self, kind: PoolKind) -> &Pool {
        &self.pools[kind.index()]
    }
}

impl IndexMut<PoolKind> for SoilPools {
    fn index_mut(&mut self, kind: PoolKind) -> &mut Pool {
        &mut self.pools[kind.index()]
    }
}

/// Summed carbon and nitrogen (g/m²).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ElementTotals {
    pub carbon: FloatValue,
    pub nitrogen: FloatValue,
}

impl Add for ElementTotals {
    type Output = ElementTotals;

    fn add(self, rhs: Self) -> Self {
        ElementTotals {
            carbon: self.carbon + rhs.carbon,
            nitrogen: self.nitrogen + rhs.nitrogen,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cn_ratio() {
        assert_eq!(Pool::new(100.0, 10.0).cn_ratio(), Some(10.0));
        assert_eq!(Pool::new(100.0, 0.0).cn_ratio(), None);
    }

    #[test]
    fn test_layers() {
        assert_eq!(PoolKind::Som1Surface.layer(), Layer::Surface);
        assert_eq!(PoolKind::Som2.layer(), Layer::Soil);
        assert_eq!(PoolKind::som1(Layer::Soil), PoolKind::Som1Soil);
        assert_eq!(PoolKind::structural(Layer::Surface), PoolKind::SurfaceStructural);
    }

    #[test]
    fn test_index_matches_all_order() {
        for (i, kind) in PoolKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn test_totals() {
        let mut pools = SoilPools::default();
        pools[PoolKind::Som2] = Pool::new(50.0, 2.5);
        pools[PoolKind::Som3] = Pool::new(25.0, 2.5);
        let totals = pools.totals();
        assert_eq!(totals.carbon, 75.0);
        assert_eq!(totals.nitrogen, 5.0);
        assert_eq!(pools.totals_of(&[PoolKind::Som3]).carbon, 25.0);
    }
}
