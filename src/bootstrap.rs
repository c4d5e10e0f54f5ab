//! Application entry point.

use crate::compiler::{Blueprint, CompileOptions, Compiler};
use crate::component::ComponentClass;
use crate::dom::Document;
use crate::error::{MountError, Result};
use crate::instance::{attach, ComponentInstance};
use crate::zone::{TickReport, Zone};
use markup5ever_rcdom::Handle;
use std::rc::Rc;
use tracing::{info, instrument, warn};

/// A mounted root component together with the zone and compiler it runs with.
#[derive(Debug)]
pub struct Application {
    zone: Rc<Zone>,
    compiler: Compiler,
    blueprint: Rc<Blueprint>,
    root: Rc<ComponentInstance>,
}

impl Application {
    pub fn zone(&self) -> &Rc<Zone> {
        &self.zone
    }

    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    pub fn blueprint(&self) -> &Rc<Blueprint> {
        &self.blueprint
    }

    pub fn root(&self) -> &Rc<ComponentInstance> {
        &self.root
    }

    pub fn host(&self) -> &Handle {
        self.root.host()
    }

    /// Refresh every input binding in the application.
    pub fn tick(&self) -> TickReport {
        self.zone.tick()
    }

    pub fn detach(&self) {
        self.root.detach();
    }
}

pub fn bootstrap(document: &Document, root: ComponentClass) -> Result<Application> {
    bootstrap_with_options(document, root, CompileOptions::default())
}

/// Compile `root` and mount it on the element whose tag matches the class name.
///
/// Nothing in the document is touched unless compilation succeeds and a host
/// element is found. Once mounted, the zone becomes the document's event
/// target, so handlers registered on the document later also tick.
#[instrument(skip_all, fields(root = root.name()))]
pub fn bootstrap_with_options(
    document: &Document,
    root: ComponentClass,
    options: CompileOptions,
) -> Result<Application> {
    let zone = Zone::new(document.events());
    let compiler = Compiler::with_options(options);
    let blueprint = compiler.compile(root)?;

    let tag = root.tag_name();
    let hosts = document.query_tag(&tag);
    let host = match hosts.first() {
        Some(host) => host.clone(),
        None => return Err(MountError::NoHostElement { tag }.into()),
    };
    if hosts.len() > 1 {
        if !compiler.options().allow_duplicate_hosts {
            return Err(MountError::DuplicateHostElement {
                tag,
                count: hosts.len(),
            }
            .into());
        }
        warn!(
            tag = %tag,
            count = hosts.len(),
            "several host elements match, mounting on the first"
        );
    }

    let instance = attach(&host, &blueprint, &zone);
    document.set_event_target(zone.clone());
    info!(tag = %tag, bindings = zone.registered(), "application bootstrapped");

    Ok(Application {
        zone,
        compiler,
        blueprint,
        root: instance,
    })
}
