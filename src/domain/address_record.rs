/// What a reverse geocoder knows about a coordinate, each field optional.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct AddressRecord {
    pub locality: Option<String>,
    pub sub_locality: Option<String>,
    pub sub_admin_area: Option<String>,
    pub feature_name: Option<String>,
    pub admin_area: Option<String>,
    pub address_line: Option<String>,
}

impl AddressRecord {
    /// The shortest meaningful place name: the first non-blank of locality, sub-locality, sub-admin-area,
    /// feature name and admin area, then the formatted address line.
    pub fn label(&self) -> Option<String> {
        [
            &self.locality,
            &self.sub_locality,
            &self.sub_admin_area,
            &self.feature_name,
            &self.admin_area,
            &self.address_line,
        ]
        .into_iter()
        .filter_map(|field| field.as_deref())
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
    }
}
