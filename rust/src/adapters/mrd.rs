//! Requirements-document export: `Number, Name, Responsible, <pool columns>...`.
//!
//! Same numbering rules as the raw dialect. The `Responsible` column is not
//! used and there is no priority column, so tasks keep plan order.

use std::path::Path;

use super::raw::{read_numbered, NumberedLayout};
use super::PlanningSource;
use crate::config::ConfigError;
use crate::models::Plan;

#[derive(Clone, Copy, Debug, Default)]
pub struct MrdCsv;

impl MrdCsv {
    const LAYOUT: NumberedLayout = NumberedLayout {
        fixed_columns: 3,
        priority: false,
    };
}

impl PlanningSource for MrdCsv {
    fn parse(&self, path: &Path) -> Result<Plan, ConfigError> {
        read_numbered(path, Self::LAYOUT)
    }
}
