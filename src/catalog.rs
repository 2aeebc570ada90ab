//! Static reference data: plans per carrier, chip types, shipping methods
//! and Brazilian states.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Plan label used in submissions when the selected id is not in the catalog.
pub const UNKNOWN_PLAN_LABEL: &str = "Plano não identificado";

/// Mobile carriers, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Carrier {
    Vivo,
    Tim,
    Claro,
}

impl std::fmt::Display for Carrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Vivo => "VIVO",
            Self::Tim => "TIM",
            Self::Claro => "CLARO",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub label: String,
    pub price: Decimal,
    pub esim_capable: bool,
}

impl Plan {
    fn new(id: &str, label: &str, price: Decimal) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            price,
            esim_capable: true,
        }
    }

    /// Price formatted the Brazilian way, e.g. `R$ 49,90`.
    pub fn price_display(&self) -> String {
        format!("R$ {:.2}", self.price).replace('.', ",")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarrierPlans {
    pub carrier: Carrier,
    pub plans: Vec<Plan>,
}

/// Read-only plan catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanCatalog {
    carriers: Vec<CarrierPlans>,
}

impl PlanCatalog {
    pub fn new(carriers: Vec<CarrierPlans>) -> Self {
        Self { carriers }
    }

    /// The plans currently on offer.
    pub fn standard() -> Self {
        Self::new(vec![
            CarrierPlans {
                carrier: Carrier::Vivo,
                plans: vec![
                    Plan::new("178", "40GB COM LIGACAO", dec!(49.90)),
                    Plan::new("69", "80GB COM LIGACAO", dec!(69.90)),
                    Plan::new("61", "150GB COM LIGACAO", dec!(99.90)),
                ],
            },
            CarrierPlans {
                carrier: Carrier::Tim,
                plans: vec![
                    Plan::new("56", "100GB COM LIGACAO", dec!(69.90)),
                    Plan::new("154", "200GB SEM LIGAÇÃO", dec!(159.90)),
                    Plan::new("155", "300GB SEM LIGAÇÃO", dec!(199.90)),
                ],
            },
            CarrierPlans {
                carrier: Carrier::Claro,
                plans: vec![
                    Plan::new("57", "80GB COM LIGACAO", dec!(69.90)),
                    Plan::new("183", "150GB COM LIGACAO", dec!(99.90)),
                ],
            },
        ])
    }

    pub fn carriers(&self) -> &[CarrierPlans] {
        &self.carriers
    }

    /// Look up a plan and the carrier offering it.
    pub fn find(&self, plan_id: &str) -> Option<(Carrier, &Plan)> {
        self.carriers.iter().find_map(|c| {
            c.plans
                .iter()
                .find(|p| p.id == plan_id)
                .map(|p| (c.carrier, p))
        })
    }

    /// `"<CARRIER> - <label>"`, or [`UNKNOWN_PLAN_LABEL`].
    pub fn plan_label(&self, plan_id: &str) -> String {
        match self.find(plan_id) {
            Some((carrier, plan)) => format!("{carrier} - {}", plan.label),
            None => UNKNOWN_PLAN_LABEL.to_string(),
        }
    }
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

/// Physical SIM card or eSIM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChipType {
    #[serde(rename = "fisico")]
    Physical,
    #[serde(rename = "eSim")]
    ESim,
}

impl ChipType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Physical => "Físico",
            Self::ESim => "e-SIM",
        }
    }
}

/// How the chip reaches the subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShippingMethod {
    #[serde(rename = "Carta")]
    RegisteredLetter,
    #[serde(rename = "semFrete")]
    Pickup,
    #[serde(rename = "eSim")]
    ESim,
}

impl ShippingMethod {
    /// Human label sent in submissions.
    pub fn label(&self) -> &'static str {
        match self {
            Self::RegisteredLetter => "Carta Registrada",
            Self::Pickup => "Retirar na Associação",
            Self::ESim => "e-SIM",
        }
    }

    /// Wire code used by the form.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RegisteredLetter => "Carta",
            Self::Pickup => "semFrete",
            Self::ESim => "eSim",
        }
    }

    /// Methods offered for a chip type.
    pub fn offered_for(chip: ChipType) -> &'static [ShippingMethod] {
        match chip {
            ChipType::Physical => &[Self::RegisteredLetter, Self::Pickup],
            ChipType::ESim => &[Self::ESim],
        }
    }
}

impl std::fmt::Display for ShippingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Brazilian federative units as `(code, name)`.
pub const BRAZILIAN_STATES: [(&str, &str); 27] = [
    ("AC", "Acre"),
    ("AL", "Alagoas"),
    ("AP", "Amapá"),
    ("AM", "Amazonas"),
    ("BA", "Bahia"),
    ("CE", "Ceará"),
    ("DF", "Distrito Federal"),
    ("ES", "Espírito Santo"),
    ("GO", "Goiás"),
    ("MA", "Maranhão"),
    ("MT", "Mato Grosso"),
    ("MS", "Mato Grosso do Sul"),
    ("MG", "Minas Gerais"),
    ("PA", "Pará"),
    ("PB", "Paraíba"),
    ("PR", "Paraná"),
    ("PE", "Pernambuco"),
    ("PI", "Piauí"),
    ("RJ", "Rio de Janeiro"),
    ("RN", "Rio Grande do Norte"),
    ("RS", "Rio Grande do Sul"),
    ("RO", "Rondônia"),
    ("RR", "Roraima"),
    ("SC", "Santa Catarina"),
    ("SP", "São Paulo"),
    ("SE", "Sergipe"),
    ("TO", "Tocantins"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_resolves_carrier() {
        let catalog = PlanCatalog::standard();
        let (carrier, plan) = catalog.find("154").unwrap();
        assert_eq!(carrier, Carrier::Tim);
        assert_eq!(plan.label, "200GB SEM LIGAÇÃO");
        assert!(catalog.find("999").is_none());
    }

    #[test]
    fn plan_label_formats_carrier_prefix() {
        let catalog = PlanCatalog::standard();
        assert_eq!(catalog.plan_label("178"), "VIVO - 40GB COM LIGACAO");
        assert_eq!(catalog.plan_label("183"), "CLARO - 150GB COM LIGACAO");
        assert_eq!(catalog.plan_label("nope"), UNKNOWN_PLAN_LABEL);
    }

    #[test]
    fn price_display_uses_comma() {
        let catalog = PlanCatalog::standard();
        let (_, plan) = catalog.find("178").unwrap();
        assert_eq!(plan.price_display(), "R$ 49,90");
        let (_, plan) = catalog.find("155").unwrap();
        assert_eq!(plan.price_display(), "R$ 199,90");
    }

    #[test]
    fn carriers_keep_display_order() {
        let catalog = PlanCatalog::standard();
        let order: Vec<Carrier> = catalog.carriers().iter().map(|c| c.carrier).collect();
        assert_eq!(order, vec![Carrier::Vivo, Carrier::Tim, Carrier::Claro]);
        assert_eq!(catalog.carriers()[0].plans[0].id, "178");
    }

    #[test]
    fn shipping_offered_per_chip() {
        assert_eq!(
            ShippingMethod::offered_for(ChipType::Physical),
            &[ShippingMethod::RegisteredLetter, ShippingMethod::Pickup]
        );
        assert_eq!(ShippingMethod::offered_for(ChipType::ESim), &[ShippingMethod::ESim]);
    }

    #[test]
    fn wire_codes_match_serde() {
        for method in [
            ShippingMethod::RegisteredLetter,
            ShippingMethod::Pickup,
            ShippingMethod::ESim,
        ] {
            let json = serde_json::to_string(&method).unwrap();
            assert_eq!(json, format!("\"{}\"", method.code()));
        }
        let chip: ChipType = serde_json::from_str("\"fisico\"").unwrap();
        assert_eq!(chip, ChipType::Physical);
        assert_eq!(chip.label(), "Físico");
        assert_eq!(ChipType::ESim.label(), "e-SIM");
    }

    #[test]
    fn states_cover_all_units() {
        assert_eq!(BRAZILIAN_STATES.len(), 27);
        assert!(BRAZILIAN_STATES.iter().any(|(code, _)| *code == "DF"));
    }
}
