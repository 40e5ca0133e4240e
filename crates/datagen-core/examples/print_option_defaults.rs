use std::collections::BTreeMap;

use datagen_core::OptionKey;

fn main() {
    let defaults: BTreeMap<&str, _> = OptionKey::ALL
        .iter()
        .map(|key| (key.as_str(), key.default_value()))
        .collect();
    let json = serde_json::to_string_pretty(&defaults).expect("serialize option defaults");
    println!("{json}");
}
