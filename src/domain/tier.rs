#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Basic,
    Premium,
    Paid,
}

impl Tier {
    pub fn parse(tier: String) -> Result<Tier, String> {
        match tier.as_str() {
            "free" => Ok(Tier::Free),
            "basic" => Ok(Tier::Basic),
            "premium" => Ok(Tier::Premium),
            "paid" => Ok(Tier::Paid),
            _ => Err(format!("{} is not a valid subscription tier", tier)),
        }
    }
}

impl AsRef<str> for Tier {
    fn as_ref(&self) -> &str {
        match self {
            Tier::Free => "free",
            Tier::Basic => "basic",
            Tier::Premium => "premium",
            Tier::Paid => "paid",
        }
    }
}
