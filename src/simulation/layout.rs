//! Fixed cell coordinates of the simulation template.
//!
//! These must match the workbook's formulas exactly.

use umya_spreadsheet::Worksheet;

use super::movements::MovementPlan;
use super::types::{MonthlyMovement, SimulationRequest, SimulationResult, MAX_MONTHS};
use crate::excel::{read_number, write_number};

pub const COST_PER_UNIT_CELL: &str = "B2";
pub const PALLET_COUNT_CELL: &str = "B3";
pub const MONTHS_CELL: &str = "B4";

pub const PALLET_PARKING_COST_CELL: &str = "B6";
pub const TRADITIONAL_COST_CELL: &str = "B7";
pub const SAVINGS_CELL: &str = "B8";

pub const FIRST_MONTH_ROW: u32 = 9;
pub const INBOUND_COLUMN: &str = "D";
pub const OUTBOUND_COLUMN: &str = "E";
pub const STOCK_COLUMN: &str = "G";

fn month_cell(column: &str, month_index: u32) -> String {
    format!("{}{}", column, FIRST_MONTH_ROW + month_index)
}

/// Write the request and the movement plan into the sheet.
///
/// All twelve movement rows are zeroed first so a shorter simulation never
/// inherits months from a previous, longer one.
pub fn write_inputs(sheet: &mut Worksheet, request: &SimulationRequest, plan: &MovementPlan) {
    write_number(sheet, COST_PER_UNIT_CELL, request.cost_per_unit);
    write_number(sheet, PALLET_COUNT_CELL, request.pallet_count as f64);
    write_number(sheet, MONTHS_CELL, request.months as f64);

    for month_index in 0..MAX_MONTHS {
        write_number(sheet, &month_cell(INBOUND_COLUMN, month_index), 0.0);
        write_number(sheet, &month_cell(OUTBOUND_COLUMN, month_index), 0.0);
    }

    for (month_index, (inbound, outbound)) in plan.inbound.iter().zip(&plan.outbound).enumerate() {
        let month_index = month_index as u32;
        write_number(sheet, &month_cell(INBOUND_COLUMN, month_index), *inbound as f64);
        write_number(sheet, &month_cell(OUTBOUND_COLUMN, month_index), *outbound as f64);
    }
}

/// Read the recalculated figures back out of the sheet.
///
/// Missing or non-numeric outputs read as 0, except savings, which falls back to
/// traditional minus pallet-parking cost.
pub fn read_outputs(sheet: &Worksheet, plan: &MovementPlan) -> SimulationResult {
    let pallet_parking_cost = read_number(sheet, PALLET_PARKING_COST_CELL).unwrap_or(0.0);
    let traditional_cost = read_number(sheet, TRADITIONAL_COST_CELL).unwrap_or(0.0);
    let savings = read_number(sheet, SAVINGS_CELL)
        .unwrap_or(traditional_cost - pallet_parking_cost);

    let monthly_table = plan
        .inbound
        .iter()
        .zip(&plan.outbound)
        .enumerate()
        .map(|(month_index, (inbound, outbound))| MonthlyMovement {
            month: month_index as u32 + 1,
            inbound: *inbound,
            outbound: *outbound,
            stock: read_number(sheet, &month_cell(STOCK_COLUMN, month_index as u32)).unwrap_or(0.0),
        })
        .collect();

    SimulationResult {
        pallet_parking_cost,
        traditional_cost,
        savings,
        monthly_table,
    }
}
