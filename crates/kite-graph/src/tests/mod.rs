
use crate::ModuleId;

pub(super) fn id(raw: &str) -> ModuleId {
    ModuleId::new(raw).unwrap()
}
