//! Referrer ("sponsor") directory and per-referrer webhook endpoints.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Referrer credited when a visitor arrives without a sponsor link.
pub const DEFAULT_REFERRER_ID: &str = "110956";

/// The person whose link brought the visitor to the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Referrer {
    pub id: String,
    pub display_name: String,
    /// WhatsApp number with country code, digits only.
    pub contact_number: String,
}

impl Referrer {
    pub fn new(id: &str, display_name: &str, contact_number: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.trim().to_string(),
            contact_number: contact_number.to_string(),
        }
    }
}

/// Referrers reachable through `/{referrer_id}` links.
pub fn builtin_referrers() -> HashMap<String, Referrer> {
    [
        Referrer::new("134684", "William Dos Santos Pessoa", "5521969400194"),
        Referrer::new("135302", "Antonia Erivania Delmiro Jacinto", "558498410187"),
        Referrer::new("153542", "Aline Aparecida Melo", "553193371195"),
        Referrer::new("88389", "Wagner Cruz Vieira", "5521996098857"),
        Referrer::new("108054", " Layanna Kristina Chagas Araujo Faustino", "5584986843611"),
        Referrer::new("140894", "  Francisco Martins Ferreira", "5584981317641"),
        Referrer::new("167641", "  Ricardo De Jesus De Almeida", "5517996339074"),
        Referrer::new("166779", " Antonio Carlos Pinto", "5513996206721"),
        Referrer::new("166775", " Diego Da Silva Felix", "553197495796"),
        Referrer::new("119294", " Narcisio Marques Da Silva", "5511974805837"),
    ]
    .into_iter()
    .map(|r| (r.id.clone(), r))
    .collect()
}

/// The sponsor used when no referrer id is supplied.
pub fn default_referrer() -> Referrer {
    Referrer::new(DEFAULT_REFERRER_ID, "Francisco Eliedisom Dos Santos", "")
}

const WEBHOOK_BASE: &str = "https://webhook.fiqon.app/webhook";

/// Submission endpoints keyed by referrer id.
///
/// Not every referrer in [`builtin_referrers`] has an endpoint; those
/// submissions are refused before dispatch.
pub fn builtin_webhooks() -> HashMap<String, String> {
    [
        ("110956", "a0265c1b-d832-483e-af57-8096334a57a8/e167dea4-079e-4af4-9b3f-4acaf711f432"),
        ("167641", "019be607-7078-705b-8c4d-47af993d4398/1006eb2e-eb37-4cff-a327-893d15364c02"),
        ("110403", "019a82d0-9018-73a8-9702-405595187191/15c6ef7c-a0c0-4b0a-b6cf-f873564be560"),
        ("88389", "a02ccd6f-0d2f-401d-8d9b-c9e161d5330e/0624b4b1-d658-44d1-8291-ed8f0b5b3bf9"),
        ("159726", "019b9b1f-c2eb-716c-a0af-b729f6f83256/3a70ef2a-050a-46b8-883a-a2ea63d93243"),
        ("140894", "019b9b2c-14e4-702c-b2e8-03caeb5615d4/6cc39296-2244-42e3-8e45-0bd92dae42bb"),
        ("163994", "019b9b0b-36fb-702e-aef4-788e7eb1c58d/655162cf-6868-4e73-92dd-c43ef37279fb"),
        ("131966", "a0436edd-0f48-454c-9fc2-f916fee56e34/ffc2252d-f738-4870-8287-81ea51a89542"),
        ("108054", "019b9b3f-4c25-7378-97f3-27329fcef7d1/50b76f62-30b6-431b-bbf4-cd5739412da3"),
        ("166779", "019c4813-3f06-7021-aee4-2e794c82bcd5/8013cf50-adf6-4f91-8267-4569e0a3ddb4"),
        ("119294", "019b9b15-2a9e-70a5-8ca1-19ac2e236a62/036e9dc0-0f7c-44b9-b16d-98b28832960f"),
    ]
    .into_iter()
    .map(|(id, path)| (id.to_string(), format!("{WEBHOOK_BASE}/{path}")))
    .collect()
}
