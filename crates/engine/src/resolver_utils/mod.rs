mod collect;
mod container;
mod field;
mod list;

pub(crate) use container::{resolve_container, resolve_root_container, resolve_root_container_serial};
