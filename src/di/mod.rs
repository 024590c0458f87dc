mod container;
mod extractor;
mod injectable;
mod injector;
mod registry;
mod resolver;

pub use container::{Container, ContainerExt, ServiceContainer, ServiceFactory};
pub use extractor::{SpecificationExtractor, SpecificationMap};
pub use injectable::{Constructor, FnFactory, Injectable};
pub use injector::{Factory, Injector, Kwargs};
pub use registry::{Registration, Registry};
pub use resolver::{AnnotatedResolver, DependencyResolver, ResolvedValues};
