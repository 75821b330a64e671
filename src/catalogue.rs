use crate::models::{OperationalTab, Persona, TileSize};
use rand::Rng;
use TileSize::{Large, Standard, Tall, Wide};
use ValueFormat::{Count, Days, Hours, Percent, Rupee, Unit};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueFormat {
    Percent,
    Hours,
    Days,
    /// `₹ <value><suffix>`
    Rupee(&'static str),
    /// `<value><suffix>`
    Unit(&'static str),
    /// Integer with thousands separators.
    Count,
}

impl ValueFormat {
    pub fn render(self, value: f64, decimals: u32) -> String {
        let number = format!("{:.*}", decimals as usize, value);
        match self {
            Self::Percent => format!("{}%", number),
            Self::Hours => format!("{} hrs", number),
            Self::Days => format!("{} days", number),
            Self::Rupee(suffix) => format!("₹ {}{}", number, suffix),
            Self::Unit(suffix) => format!("{}{}", number, suffix),
            Self::Count => group_thousands(value.round() as i64),
        }
    }
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        grouped.push('-');
    }
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Uniform jitter around a baseline, rounded to `decimals`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Draw {
    pub baseline: f64,
    pub jitter: f64,
    pub decimals: u32,
}

impl Draw {
    pub const fn around(baseline: f64, jitter: f64, decimals: u32) -> Self {
        Self {
            baseline,
            jitter,
            decimals,
        }
    }

    /// Whole numbers in `[low, high]`.
    pub const fn between(low: f64, high: f64) -> Self {
        Self {
            baseline: (low + high) / 2.0,
            jitter: (high - low) / 2.0,
            decimals: 0,
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let jitter = self.jitter.abs();
        if self.decimals == 0 {
            // Every whole number in range is equally likely, endpoints included.
            let low = (self.baseline - jitter).ceil() as i64;
            let high = (self.baseline + jitter).floor() as i64;
            if low <= high {
                return rng.random_range(low..=high) as f64;
            }
        }
        let raw = self.baseline + rng.random_range(-jitter..=jitter);
        crate::series::round_to(raw, self.decimals)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MetricSpec {
    pub id: &'static str,
    pub name: &'static str,
    pub draw: Draw,
    pub format: ValueFormat,
    pub target: &'static str,
    pub lower_is_better: bool,
    pub tile_size: TileSize,
}

impl MetricSpec {
    pub fn sample_value<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let mut value = self.draw.sample(rng).max(0.0);
        if self.format == ValueFormat::Percent {
            value = value.min(100.0);
        }
        self.format.render(value, self.draw.decimals)
    }
}

/// Week-over-week metric: the current reading is drawn, last week's reading
/// is the current one moved by `shift` against the metric's direction.
#[derive(Debug, Clone, Copy)]
pub struct WeeklySpec {
    pub id: &'static str,
    pub name: &'static str,
    pub draw: Draw,
    pub shift: Draw,
    pub format: ValueFormat,
    pub target: Option<&'static str>,
    pub lower_is_better: bool,
}

impl WeeklySpec {
    pub fn sample_values<R: Rng + ?Sized>(&self, rng: &mut R) -> (String, String) {
        let current = self.draw.sample(rng).max(0.0);
        let shift = self.shift.sample(rng);
        let last_week = if self.lower_is_better {
            current + shift
        } else {
            current - shift
        };
        let clamp = |value: f64| {
            let value = value.max(0.0);
            if self.format == ValueFormat::Percent {
                value.min(100.0)
            } else {
                value
            }
        };
        (
            self.format.render(clamp(current), self.draw.decimals),
            self.format.render(clamp(last_week), self.draw.decimals),
        )
    }
}

const fn metric(
    id: &'static str,
    name: &'static str,
    draw: Draw,
    format: ValueFormat,
    target: &'static str,
    lower_is_better: bool,
    tile_size: TileSize,
) -> MetricSpec {
    MetricSpec {
        id,
        name,
        draw,
        format,
        target,
        lower_is_better,
        tile_size,
    }
}

const fn weekly(
    id: &'static str,
    name: &'static str,
    draw: Draw,
    shift: Draw,
    format: ValueFormat,
    target: Option<&'static str>,
    lower_is_better: bool,
) -> WeeklySpec {
    WeeklySpec {
        id,
        name,
        draw,
        shift,
        format,
        target,
        lower_is_better,
    }
}

const HIGHER: bool = false;
const LOWER: bool = true;

// ─── Personas ───────────────────────────────────────────────────────────────

pub const CXO_METRICS: &[MetricSpec] = &[
    metric("revenueProfitTrends", "Revenue & Profit Trends", Draw::around(12.5, 1.5, 1), Rupee(" Cr"), "₹ 15 Cr", HIGHER, Large),
    metric("orderToDelivery", "Order to Delivery (OTD)", Draw::around(4.2, 0.4, 1), Days, "3.5 days", LOWER, Wide),
    metric("freightCost", "Freight Cost per KM/Tonnage", Draw::around(45.0, 3.0, 0), Rupee("/km"), "₹ 40/km", LOWER, Wide),
    metric("carbonEmissions", "Carbon Emissions", Draw::around(125.0, 10.0, 0), Unit(" tons"), "100 tons", LOWER, Tall),
    metric("otif", "On-Time In-Full (OTIF)", Draw::around(82.0, 5.0, 0), Percent, "90%", HIGHER, Standard),
    metric("outboundFreightCost", "Outbound Freight Cost % of Sales", Draw::around(8.2, 0.6, 1), Percent, "7.5%", LOWER, Standard),
    metric("inboundFreightCost", "Inbound Freight Cost % of Purchases", Draw::around(6.8, 0.5, 1), Percent, "6.0%", LOWER, Standard),
    metric("fuelEfficiency", "Fuel Efficiency", Draw::around(4.2, 0.3, 1), Unit(" km/L"), "4.5 km/L", HIGHER, Standard),
    metric("vehicleUtilization", "Vehicle Utilization", Draw::around(78.0, 5.0, 0), Percent, "85%", HIGHER, Standard),
    metric("trips", "Trips (FTL/PTL)", Draw::around(1250.0, 100.0, 0), Count, "1,400", HIGHER, Standard),
    metric("salesDeliveryOrders", "Sales & Delivery Orders", Draw::around(3850.0, 200.0, 0), Count, "4,000", HIGHER, Standard),
];

pub const COMPANY_METRICS: &[MetricSpec] = &[
    metric("orderExecutionTime", "Order Execution Time (OET)", Draw::around(3.8, 0.4, 1), Days, "3.0 days", LOWER, Large),
    metric("vehicleUtilization", "Vehicle, Weight, Volume Utilization", Draw::around(76.0, 5.0, 0), Percent, "85%", HIGHER, Wide),
    metric("freightCosts", "Freight Costs per KM/Tonnage/Unit", Draw::around(42.0, 3.0, 0), Rupee("/km"), "₹ 38/km", LOWER, Wide),
    metric("transitUnloadingTime", "Transit Time & Unloading Time", Draw::around(32.0, 3.0, 0), Hours, "28 hrs", LOWER, Tall),
    metric("placementEfficiency", "Placement Efficiency", Draw::around(82.0, 5.0, 0), Percent, "90%", HIGHER, Standard),
    metric("cleanPod", "Clean POD & Invoices", Draw::around(78.0, 5.0, 0), Percent, "95%", HIGHER, Standard),
    metric("costPercentage", "Cost as % of Sales & Purchases", Draw::around(7.5, 0.5, 1), Percent, "6.5%", LOWER, Standard),
    metric("otherCharges", "Other Charges Breakdown", Draw::around(12.5, 1.5, 1), Rupee("L"), "₹ 10.0L", LOWER, Standard),
    metric("invoiceCycle", "Invoice Cycle Analysis", Draw::around(12.0, 2.0, 0), Days, "7 days", LOWER, Standard),
    metric("materialInvoices", "Material Invoices", Draw::around(1250.0, 100.0, 0), Count, "1,400", HIGHER, Standard),
    metric("freightInvoices", "Freight Invoices", Draw::around(850.0, 60.0, 0), Count, "900", HIGHER, Standard),
    metric("tripCount", "Trip Count (FTL/PTL)", Draw::around(650.0, 50.0, 0), Count, "700", HIGHER, Standard),
];

pub const BRANCH_METRICS: &[MetricSpec] = &[
    metric("statusFlow", "Status Flow (Indent to Gate Out)", Draw::around(6.5, 0.8, 1), Hours, "5.0 hrs", LOWER, Large),
    metric("realTimeTrips", "Real-time FTL/PTL Trips", Draw::around(42.0, 6.0, 0), Unit(" active"), "50 active", HIGHER, Wide),
    metric("vehicleUtilization", "Vehicle Utilization", Draw::around(75.0, 5.0, 0), Percent, "85%", HIGHER, Wide),
    metric("transitTimeMonitoring", "Transit Time Monitoring", Draw::around(18.5, 1.5, 1), Hours, "16.0 hrs", LOWER, Tall),
    metric("unloadingTurnaround", "Unloading & Turnaround Times", Draw::around(4.2, 0.5, 1), Hours, "3.5 hrs", LOWER, Standard),
    metric("cleanPod", "Clean POD", Draw::around(82.0, 5.0, 0), Percent, "95%", HIGHER, Standard),
    metric("invoiceSubmission", "Invoice Submission to Approval", Draw::around(3.8, 0.4, 1), Days, "2.0 days", LOWER, Standard),
    metric("weightVolumeMetrics", "Weight & Volume Metrics", Draw::around(82.0, 5.0, 0), Percent, "90%", HIGHER, Standard),
    metric("placementEfficiency", "Placement Efficiency", Draw::around(85.0, 5.0, 0), Percent, "95%", HIGHER, Standard),
    metric("orderExecutionTime", "Order Execution Time (OET)", Draw::around(3.2, 0.3, 1), Days, "2.5 days", LOWER, Standard),
    metric("salesDeliveryOrders", "Sales & Delivery Orders", Draw::around(450.0, 30.0, 0), Count, "500", HIGHER, Standard),
    metric("materialFreightInvoices", "Material & Freight Invoices", Draw::around(380.0, 25.0, 0), Count, "420", HIGHER, Standard),
];

pub const IMPORTANT_KPIS: &[MetricSpec] = &[
    metric("unloadingTime", "Unloading Time", Draw::around(2.5, 0.5, 1), Hours, "2.0 hrs", LOWER, Standard),
    metric("cleanPOD", "Clean POD", Draw::around(82.0, 5.0, 0), Percent, "90%", HIGHER, Standard),
    metric("placementEfficiency", "Placement Efficiency", Draw::around(78.0, 5.0, 0), Percent, "85%", HIGHER, Standard),
    metric("salesOrders", "Sales Orders", Draw::between(420.0, 480.0), Count, "500", HIGHER, Standard),
];

pub fn persona_metrics(persona: Persona) -> &'static [MetricSpec] {
    match persona {
        Persona::Cxo => CXO_METRICS,
        Persona::Company => COMPANY_METRICS,
        Persona::Branch => BRANCH_METRICS,
    }
}

// ─── Operational tabs ───────────────────────────────────────────────────────

pub const PLANNING_METRICS: &[WeeklySpec] = &[
    weekly("shipmentsPlanned", "Shipments Planned", Draw::between(230.0, 260.0), Draw::between(-10.0, 15.0), Count, Some("230"), HIGHER),
    weekly("shipmentsNotPlanned", "Shipments Not Planned", Draw::between(25.0, 40.0), Draw::between(-5.0, 8.0), Count, Some("25"), LOWER),
    weekly("plannedOnTime", "Planned on Time", Draw::around(88.0, 3.0, 1), Draw::between(-3.0, 6.0), Percent, Some("90%"), HIGHER),
    weekly("planningSLABreached", "Planning SLA Breached", Draw::between(15.0, 25.0), Draw::between(-3.0, 6.0), Count, Some("15"), LOWER),
];

pub const INDENT_METRICS: &[WeeklySpec] = &[
    weekly("indentsPublished", "Indents Published", Draw::between(165.0, 190.0), Draw::between(-5.0, 10.0), Count, Some("170"), HIGHER),
    weekly("indentsAccepted", "Indents Accepted", Draw::between(140.0, 165.0), Draw::between(-5.0, 10.0), Count, Some("160"), HIGHER),
];

pub const FTL_METRICS: &[WeeklySpec] = &[
    weekly("tripsStarted", "Trips Started", Draw::between(110.0, 125.0), Draw::between(-5.0, 8.0), Count, Some("115"), HIGHER),
    weekly("tripsNotStarted", "Trips Not Started", Draw::between(10.0, 20.0), Draw::between(-2.0, 4.0), Count, Some("10"), LOWER),
    weekly("onTimeTrips", "On-Time Trips (%)", Draw::around(78.0, 5.0, 1), Draw::between(-3.0, 6.0), Percent, Some("85%"), HIGHER),
    weekly("trucksArrivingToday", "Trucks Arriving Today", Draw::between(22.0, 32.0), Draw::between(-3.0, 4.0), Count, Some("25"), HIGHER),
];

pub const PTL_METRICS: &[WeeklySpec] = &[
    weekly("ordersGenerated", "Orders Generated", Draw::between(310.0, 340.0), Draw::between(-10.0, 15.0), Count, Some("300"), HIGHER),
    weekly("ordersAssigned", "Orders Assigned to Couriers", Draw::between(285.0, 310.0), Draw::between(-8.0, 13.0), Count, Some("310"), HIGHER),
    weekly("ordersPickedUp", "Orders Picked Up", Draw::between(260.0, 290.0), Draw::between(-8.0, 15.0), Count, Some("290"), HIGHER),
    weekly("delayedDeliveries", "Delayed Deliveries", Draw::between(28.0, 38.0), Draw::between(-3.0, 6.0), Count, Some("25"), LOWER),
];

pub const FREIGHT_INVOICING_METRICS: &[WeeklySpec] = &[
    weekly("invoicesRaised", "Invoices Raised", Draw::between(135.0, 150.0), Draw::between(-5.0, 7.0), Count, Some("140"), HIGHER),
    weekly("invoicesApproved", "Invoices Approved", Draw::between(120.0, 135.0), Draw::between(-5.0, 7.0), Count, Some("130"), HIGHER),
    weekly("invoiceApprovalTime", "Invoice Approval Time", Draw::around(2.8, 0.3, 1), Draw::around(0.25, 0.15, 1), Days, Some("2.5 days"), LOWER),
    weekly("rejectedInvoices", "Rejected Invoices", Draw::between(5.0, 12.0), Draw::between(-2.0, 4.0), Count, Some("5"), LOWER),
];

pub fn tab_metrics(tab: OperationalTab) -> &'static [WeeklySpec] {
    match tab {
        OperationalTab::Planning => PLANNING_METRICS,
        OperationalTab::Indent => INDENT_METRICS,
        OperationalTab::Ftl => FTL_METRICS,
        OperationalTab::Ptl => PTL_METRICS,
        OperationalTab::FreightInvoicing => FREIGHT_INVOICING_METRICS,
    }
}

#[cfg(test)]
mod tests {
    use super::{persona_metrics, tab_metrics, Draw, ValueFormat, WeeklySpec, IMPORTANT_KPIS};
    use crate::models::{OperationalTab, Persona};
    use crate::parser::parse_value;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn renders_each_format() {
        assert_eq!(ValueFormat::Percent.render(82.0, 0), "82%");
        assert_eq!(ValueFormat::Hours.render(2.46, 1), "2.5 hrs");
        assert_eq!(ValueFormat::Days.render(3.8, 1), "3.8 days");
        assert_eq!(ValueFormat::Rupee(" Cr").render(12.5, 1), "₹ 12.5 Cr");
        assert_eq!(ValueFormat::Rupee("/km").render(45.0, 0), "₹ 45/km");
        assert_eq!(ValueFormat::Unit(" km/L").render(4.2, 1), "4.2 km/L");
        assert_eq!(ValueFormat::Count.render(1250.0, 0), "1,250");
        assert_eq!(ValueFormat::Count.render(1234567.0, 0), "1,234,567");
        assert_eq!(ValueFormat::Count.render(420.0, 0), "420");
    }

    #[test]
    fn integer_draws_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(5);
        let draw = Draw::between(420.0, 480.0);
        for _ in 0..500 {
            let value = draw.sample(&mut rng);
            assert!((420.0..=480.0).contains(&value));
            assert_eq!(value.fract(), 0.0);
        }
    }

    #[test]
    fn integer_draw_endpoints_are_as_likely_as_interior() {
        let mut rng = StdRng::seed_from_u64(8);
        let draw = Draw::between(1.0, 3.0);
        let mut counts = [0usize; 3];
        for _ in 0..3000 {
            counts[draw.sample(&mut rng) as usize - 1] += 1;
        }
        for count in counts {
            assert!((850..=1150).contains(&count), "{:?}", counts);
        }
    }

    #[test]
    fn catalogue_ids_are_unique_per_persona() {
        for persona in Persona::ALL {
            let ids: HashSet<_> = persona_metrics(persona).iter().map(|spec| spec.id).collect();
            assert_eq!(ids.len(), persona_metrics(persona).len(), "duplicate id in {:?}", persona);
        }
    }

    #[test]
    fn sampled_values_and_targets_parse() {
        let mut rng = StdRng::seed_from_u64(17);
        let specs = Persona::ALL
            .iter()
            .flat_map(|persona| persona_metrics(*persona).iter())
            .chain(IMPORTANT_KPIS.iter());
        for spec in specs {
            let value = spec.sample_value(&mut rng);
            assert!(parse_value(&value).is_ok(), "{} rendered {:?}", spec.id, value);
            assert!(parse_value(spec.target).is_ok(), "{} target {:?}", spec.id, spec.target);
        }
    }

    #[test]
    fn last_week_moves_against_direction() {
        let mut rng = StdRng::seed_from_u64(23);
        let spec = WeeklySpec {
            id: "fixed",
            name: "Fixed",
            draw: Draw::between(100.0, 100.0),
            shift: Draw::between(5.0, 5.0),
            format: ValueFormat::Count,
            target: None,
            lower_is_better: true,
        };
        assert_eq!(spec.sample_values(&mut rng), ("100".to_string(), "105".to_string()));

        let higher = WeeklySpec {
            lower_is_better: false,
            ..spec
        };
        assert_eq!(higher.sample_values(&mut rng), ("100".to_string(), "95".to_string()));
    }

    #[test]
    fn every_tab_has_metrics() {
        for tab in OperationalTab::ALL {
            assert!(!tab_metrics(tab).is_empty(), "{:?} is empty", tab);
        }
    }
}
