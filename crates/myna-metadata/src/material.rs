/// Canonical material name.
///
/// Upper-cases, strips spaces and dashes, then folds known synonyms.
pub fn normalize_material(raw: &str) -> String {
    let compact: String = raw
        .to_uppercase()
        .chars()
        .filter(|c| *c != ' ' && *c != '-')
        .collect();

    let canonical = match compact.as_str() {
        "INCONEL625" => "IN625",
        "INCONEL718" => "IN718",
        "STAINLESSSTEEL316H" | "316HSS" | "316HSTAINLESSSTEEL" => "SS316H",
        "STAINLESSSTEEL316L"
        | "316LSS"
        | "316LSTAINLESSSTEEL"
        | "316STAINLESSSTEEL"
        | "STAINLESSSTEEL316"
        | "316SS" => "SS316L",
        _ => return compact,
    };
    canonical.to_string()
}
