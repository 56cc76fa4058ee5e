//! Per line item resolution input and the property names resolvers read

use crate::fulfillment::order::{LineItem, Order};

pub const CONFIGURATION_ID: &str = "Configuration ID";
pub const MAP_CONFIG: &str = "Map Config";
pub const PREVIEW_ID: &str = "Preview ID";
pub const ACTIVITY_ID: &str = "Activity ID";
pub const ATHLETE_ID: &str = "Athlete ID";
pub const PRINT_SIZE: &str = "Print Size";
pub const ORIENTATION: &str = "Orientation";
pub const MAP_STYLE: &str = "Map Style";
pub const ROUTE_COLOR: &str = "Route Color";
pub const ROUTE_WIDTH: &str = "Route Width";

/// Borrowed order and line item handed to every resolver
#[derive(Debug, Clone, Copy)]
pub struct ResolutionContext<'a> {
    pub order: &'a Order,
    pub line_item: &'a LineItem,
}

impl<'a> ResolutionContext<'a> {
    pub fn new(order: &'a Order, line_item: &'a LineItem) -> Self {
        Self { order, line_item }
    }

    pub fn property(&self, name: &str) -> Option<String> {
        self.line_item.property(name)
    }
}
