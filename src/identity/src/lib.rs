pub mod containers;
pub mod process;
pub mod resolver;

pub use containers::{Container, ContainerInventory, ContainerRuntime, DockerRuntime};
pub use process::{
    port_owner_lookup, FuserLookup, PortOwnerLookup, ProcessTree, ProcfsLookup, SysinfoProcessTree,
};
pub use resolver::{IdentityResolver, ResolutionMode};
