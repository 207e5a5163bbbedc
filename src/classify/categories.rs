use serde::{Deserialize, Serialize};

/// One risk category: a weight and the keywords that signal it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDefinition {
    pub name: String,

    /// Importance of the category, 30 through 100
    pub weight: u32,

    pub keywords: Vec<String>,
}

impl CategoryDefinition {
    pub fn new(name: &str, weight: u32, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            weight,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Built-in category table, in declaration order
///
/// Declaration order matters: it breaks ties when picking a page's
/// best-fit category label.
pub fn default_categories() -> Vec<CategoryDefinition> {
    vec![
        CategoryDefinition::new(
            "drugs",
            60,
            &[
                "drugs", "cocaine", "heroin", "fentanyl", "mdma", "ecstasy", "meth",
                "amphetamine", "lsd", "cannabis", "marijuana", "weed", "ketamine", "opioids",
                "steroids", "pills",
            ],
        ),
        CategoryDefinition::new(
            "weapons",
            80,
            &[
                "weapons", "guns", "firearms", "pistol", "rifle", "ammunition", "ammo",
                "explosives", "grenades", "knives", "tactical", "silencer", "suppressor",
                "armor", "bulletproof",
            ],
        ),
        CategoryDefinition::new(
            "hacking",
            50,
            &[
                "hacking", "malware", "ransomware", "spyware", "botnet", "ddos", "phishing",
                "exploit", "vulnerability", "zero-day", "rootkit", "keylogger", "cracking",
                "breach", "backdoor",
            ],
        ),
        CategoryDefinition::new(
            "counterfeit",
            60,
            &[
                "counterfeit", "fake", "forged", "documents", "passports", "id cards",
                "driver license", "credit cards", "currency", "money", "bills", "banknotes",
                "hologram", "clone",
            ],
        ),
        CategoryDefinition::new(
            "financial_crime",
            70,
            &[
                "carding", "dumps", "cvv", "fullz", "bank drops", "money laundering",
                "bitcoin tumbler", "crypto mixer", "paypal accounts", "wire transfer",
                "western union", "bank login",
            ],
        ),
        CategoryDefinition::new(
            "illegal_services",
            90,
            &[
                "hitman", "murder", "assassination", "kidnapping", "torture",
                "human trafficking", "organ trafficking", "smuggling", "bribery", "extortion",
                "blackmail", "fraud",
            ],
        ),
        CategoryDefinition::new(
            "data_breach",
            65,
            &[
                "stolen data", "leaked database", "hacked accounts", "personal information",
                "doxing", "social security", "medical records", "financial data",
                "corporate secrets", "credentials",
            ],
        ),
        CategoryDefinition::new(
            "extreme_illegal",
            100,
            &[
                "child", "underage", "abuse", "exploitation", "rape", "snuff", "torture",
                "terrorism", "extremist", "jihad", "bomb making", "suicide", "genocide",
                "violence",
            ],
        ),
    ]
}
