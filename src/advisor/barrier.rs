//! Barrier lookup and log-scaling for the OTR/WVTR chart.
//!
//! Purely numeric: axis domains and tick formatting belong to the renderer.

use tracing::debug;

use crate::catalog::MaterialCatalog;

use super::types::{BarrierGrade, BarrierProfileTable, BarrierValues, ChartPoint, ReferencePoint};

/// Smallest value taken to the log; keeps zero and negative inputs finite.
pub const LOG_FLOOR: f64 = 0.001;

/// Floor then base-10 log. Never returns -inf or NaN.
pub fn log_scale(value: f64) -> f64 {
    // f64::max ignores NaN, so a NaN input also lands on the floor.
    value.max(LOG_FLOOR).log10()
}

/// Oxygen barrier class, cc/m2/day.
pub fn grade_otr(otr: f64) -> BarrierGrade {
    if otr <= 1.0 {
        BarrierGrade::Ultra
    } else if otr <= 10.0 {
        BarrierGrade::High
    } else if otr <= 500.0 {
        BarrierGrade::Medium
    } else {
        BarrierGrade::Low
    }
}

/// Moisture barrier class, g/m2/day.
pub fn grade_wvtr(wvtr: f64) -> BarrierGrade {
    if wvtr <= 0.5 {
        BarrierGrade::Ultra
    } else if wvtr <= 2.0 {
        BarrierGrade::High
    } else if wvtr <= 10.0 {
        BarrierGrade::Medium
    } else {
        BarrierGrade::Low
    }
}

pub struct BarrierProfileMapper<'a> {
    table: &'a BarrierProfileTable,
}

impl<'a> BarrierProfileMapper<'a> {
    pub fn new(table: &'a BarrierProfileTable) -> Self {
        Self { table }
    }

    /// Chart position for a profile key. Keys without a table entry use the
    /// table's default point and come back with `approximate` set.
    pub fn map_to_chart_point(&self, profile_key: &str) -> ChartPoint {
        let (values, approximate) = match self.table.get(profile_key) {
            Some(values) => (values, false),
            None => {
                debug!("No barrier profile for '{}'; using default point", profile_key);
                (self.table.default_point(), true)
            }
        };
        to_chart_point(values, approximate)
    }

    /// One background point per catalog material, from the film's own
    /// OTR/WVTR, in catalog order.
    pub fn reference_points(&self, catalog: &MaterialCatalog) -> Vec<ReferencePoint> {
        catalog
            .iter()
            .map(|m| ReferencePoint {
                material: m.id.clone(),
                label: m.abbreviation.clone(),
                log_otr: log_scale(m.otr),
                log_wvtr: log_scale(m.wvtr),
            })
            .collect()
    }
}

fn to_chart_point(values: BarrierValues, approximate: bool) -> ChartPoint {
    let otr = values.otr.max(LOG_FLOOR);
    let wvtr = values.wvtr.max(LOG_FLOOR);
    ChartPoint {
        log_otr: otr.log10(),
        log_wvtr: wvtr.log10(),
        otr,
        wvtr,
        approximate,
        otr_grade: grade_otr(otr),
        wvtr_grade: grade_wvtr(wvtr),
    }
}
