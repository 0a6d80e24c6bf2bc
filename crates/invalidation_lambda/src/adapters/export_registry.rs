use invalidation_core::contract::ExportPage;

pub trait ExportRegistry {
    fn list_exports(&self, next_token: Option<&str>) -> Result<ExportPage, String>;
}
