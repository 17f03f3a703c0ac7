use crate::{CancelBag, WeakMap};
use std::{any::Any, cell::RefCell, rc::Rc};

/// An object which displays the `State` of a reactor, and sends it
/// `Action`s.
///
/// Views declare no storage for their reactor or their bindings:
/// [ViewExt::set_reactor()] keeps both on the view's behalf, for as
/// long as the view is alive.
pub trait View: 'static {
    type Reactor: 'static;

    /// Set up the bindings between this view and `reactor`. Every
    /// [Cancellable](crate::Cancellable) stored in `cancellables` is
    /// kept alive until the view's reactor is replaced or the view is
    /// dropped.
    fn bind(self: &Rc<Self>, reactor: &Rc<Self::Reactor>, cancellables: &mut CancelBag);
}

struct ViewBinding {
    reactor: Rc<dyn Any>,
    cancellables: CancelBag,
}

thread_local! {
    static VIEW_BINDINGS: RefCell<WeakMap<dyn Any, ViewBinding>> = RefCell::new(WeakMap::new());
}

/// Release the reactor and cancel the bindings of every dropped view.
/// Returns the number of views released.
pub(crate) fn prune_view_bindings() -> usize {
    let evicted = VIEW_BINDINGS.with(|bindings| match bindings.try_borrow_mut() {
        Ok(mut bindings) => bindings.prune(),
        Err(_) => Vec::new(),
    });
    if !evicted.is_empty() {
        log::trace!("released the reactors of {} dropped views", evicted.len());
    }
    evicted.len()
}

fn same_reactor<R: 'static>(stored: &Rc<dyn Any>, reactor: &Rc<R>) -> bool {
    Rc::as_ptr(stored) as *const () == Rc::as_ptr(reactor) as *const ()
}

pub trait ViewExt: View + Sized {
    /// The reactor currently bound to this view.
    fn reactor(self: &Rc<Self>) -> Option<Rc<Self::Reactor>>;

    /// Replace the reactor bound to this view. The bindings made for
    /// the previous reactor are cancelled, then [View::bind()] is
    /// called for the new one (if any), which is already visible
    /// through [ViewExt::reactor()] at that point.
    fn set_reactor(self: &Rc<Self>, reactor: Option<Rc<Self::Reactor>>);
}

impl<V: View> ViewExt for V {
    fn reactor(self: &Rc<Self>) -> Option<Rc<Self::Reactor>> {
        prune_view_bindings();
        let owner: Rc<dyn Any> = self.clone();
        VIEW_BINDINGS
            .with(|bindings| {
                bindings
                    .borrow()
                    .get(&owner)
                    .map(|binding| binding.reactor.clone())
            })
            .and_then(|reactor| reactor.downcast::<V::Reactor>().ok())
    }

    fn set_reactor(self: &Rc<Self>, reactor: Option<Rc<Self::Reactor>>) {
        prune_view_bindings();
        let owner: Rc<dyn Any> = self.clone();
        let previous = VIEW_BINDINGS.with(|bindings| {
            let mut bindings = bindings.borrow_mut();
            match &reactor {
                Some(reactor) => bindings.insert(
                    &owner,
                    ViewBinding {
                        reactor: reactor.clone(),
                        cancellables: CancelBag::new(),
                    },
                ),
                None => bindings.remove(&owner),
            }
        });
        drop(previous);

        let reactor = match reactor {
            Some(reactor) => reactor,
            None => return,
        };

        let mut cancellables = CancelBag::new();
        self.bind(&reactor, &mut cancellables);
        log::trace!("bound view with {} bindings", cancellables.len());

        // `bind` may itself have replaced the reactor, in which case
        // these bindings are stale.
        let stale = VIEW_BINDINGS.with(|bindings| {
            match bindings.borrow_mut().get_mut(&owner) {
                Some(binding) if same_reactor(&binding.reactor, &reactor) => {
                    std::mem::replace(&mut binding.cancellables, cancellables)
                }
                _ => cancellables,
            }
        });
        drop(stale);
    }
}
