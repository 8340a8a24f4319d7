use crate::core::{error::Error, spot_price::PriceArea};

/// Danish grid operators and the bidding zone their grid is in.
///
/// Jutland and Funen are in DK1, Zealand, the islands and Bornholm are in DK2.
const GRID_OPERATORS: &[(&str, PriceArea)] = &[
    ("Aal El-Net", PriceArea::Dk1),
    ("Cerius", PriceArea::Dk2),
    ("Dinel", PriceArea::Dk1),
    ("El-net Kongerslev", PriceArea::Dk1),
    ("Elektrus", PriceArea::Dk2),
    ("Elinord", PriceArea::Dk1),
    ("Elnet Midt", PriceArea::Dk1),
    ("FLOW Elnet", PriceArea::Dk1),
    ("Hammel Elforsyning Net", PriceArea::Dk1),
    ("Hurup Elværk Net", PriceArea::Dk1),
    ("Ikast El Net", PriceArea::Dk1),
    ("Kimbrer Elnet", PriceArea::Dk1),
    ("Konstant Net", PriceArea::Dk1),
    ("L-Net", PriceArea::Dk1),
    ("Læsø Elnet", PriceArea::Dk1),
    ("Midtfyns Elforsyning", PriceArea::Dk1),
    ("N1", PriceArea::Dk1),
    ("Nakskov Elnet", PriceArea::Dk2),
    ("NKE-Elnet", PriceArea::Dk2),
    ("NOE Net", PriceArea::Dk1),
    ("Nord Energi Net", PriceArea::Dk1),
    ("Radius Elnet", PriceArea::Dk2),
    ("RAH Net", PriceArea::Dk1),
    ("Sunds Net", PriceArea::Dk1),
    ("Tarm Elværk Net", PriceArea::Dk1),
    ("TREFOR El-net", PriceArea::Dk1),
    ("TREFOR El-net Øst", PriceArea::Dk2),
    ("Veksel", PriceArea::Dk1),
    ("Vores Elnet", PriceArea::Dk1),
    ("Zeanet", PriceArea::Dk2),
];

/// Look the grid operator up by name, ignoring case and the `A/S` suffix.
pub fn resolve_price_area(grid_operator_name: &str) -> Result<PriceArea, Error> {
    let needle = normalize(grid_operator_name);
    GRID_OPERATORS
        .iter()
        .find(|(name, _)| normalize(name) == needle)
        .map(|(_, price_area)| *price_area)
        .ok_or_else(|| Error::UnknownGridOperator(grid_operator_name.to_owned()))
}

fn normalize(name: &str) -> String {
    let name = name.trim().to_lowercase();
    name.strip_suffix("a/s").map_or(name.as_str(), str::trim_end).to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_price_area() {
        assert_eq!(resolve_price_area("Radius Elnet A/S").unwrap(), PriceArea::Dk2);
        assert_eq!(resolve_price_area("N1 A/S").unwrap(), PriceArea::Dk1);
        assert_eq!(resolve_price_area("trefor el-net øst").unwrap(), PriceArea::Dk2);
        assert_eq!(resolve_price_area(" TREFOR El-net A/S ").unwrap(), PriceArea::Dk1);
    }

    #[test]
    fn test_unknown_grid_operator() {
        assert!(matches!(
            resolve_price_area("Vattenfall Eldistribution AB"),
            Err(Error::UnknownGridOperator(name)) if name == "Vattenfall Eldistribution AB"
        ));
    }
}
