use crate::{ActionSink, CancelBag, Connectable, Multicast, Scheduler, WeakMap};
use futures::{
    future,
    stream::{self, LocalBoxStream},
    StreamExt,
};
use std::{
    any::{type_name, Any},
    cell::RefCell,
    rc::{Rc, Weak},
};

/// Implementors of this trait describe how a stream of `Action`s is
/// turned into a stream of immutable `State`s.
///
/// An `Action` sent to the reactor (see [ReactorExt::action()]) is
/// turned into zero or more `Mutation`s by [Reactor::mutate()], and
/// each `Mutation` is folded into the previous `State` by
/// [Reactor::reduce()] to produce the next `State`. The `transform_*`
/// methods can modify each stage of this pipeline as a whole.
///
/// Every method other than [Reactor::initial_state()] has a default
/// implementation. The pipeline only ever holds a weak reference to
/// the reactor: once the reactor is dropped, work which is still in
/// flight contributes nothing.
pub trait Reactor: 'static {
    type Action: Clone + 'static;
    /// May be the same type as `Action`, in which case the default
    /// [Reactor::mutate()] passes every action through.
    type Mutation: 'static;
    type State: Clone + 'static;

    /// The first `State`, emitted before any `Mutation` has been
    /// reduced. This should be pure.
    fn initial_state(&self) -> Self::State;

    /// The scheduling context which the pipeline runs on. Read once,
    /// when the pipeline is created.
    fn scheduler(&self) -> Scheduler {
        Scheduler::current()
    }

    /// Modify the stream of actions, for example to prepend a startup
    /// action or to merge in another source of actions.
    fn transform_action(
        &self,
        action: LocalBoxStream<'static, Self::Action>,
    ) -> LocalBoxStream<'static, Self::Action> {
        action
    }

    /// Produce the `Mutation`s for an `Action`, possibly
    /// asynchronously. Failures of effectful work in here should be
    /// converted into `Mutation`s (see
    /// [recover()](crate::ReactiveStreamExt::recover())).
    ///
    /// By default nothing is produced, unless `Mutation` and `Action`
    /// are the same type, in which case the action itself is produced.
    fn mutate(&self, action: Self::Action) -> LocalBoxStream<'static, Self::Mutation> {
        passthrough(action)
    }

    /// Modify the combined stream of mutations of every action.
    fn transform_mutation(
        &self,
        mutation: LocalBoxStream<'static, Self::Mutation>,
    ) -> LocalBoxStream<'static, Self::Mutation> {
        mutation
    }

    /// Produce the next `State` from the previous `state` and a
    /// `mutation`. The previous state must be left untouched.
    fn reduce(&self, state: &Self::State, _mutation: Self::Mutation) -> Self::State {
        state.clone()
    }

    /// Modify the stream of states.
    fn transform_state(
        &self,
        state: LocalBoxStream<'static, Self::State>,
    ) -> LocalBoxStream<'static, Self::State> {
        state
    }
}

/// A stream with the single `action` as a mutation if `Mutation` is
/// the same type as `Action`, otherwise an empty stream.
fn passthrough<Action: 'static, Mutation: 'static>(
    action: Action,
) -> LocalBoxStream<'static, Mutation> {
    let action: Box<dyn Any> = Box::new(action);
    match action.downcast::<Mutation>() {
        Ok(mutation) => stream::once(future::ready(*mutation)).boxed_local(),
        Err(_) => stream::empty().boxed_local(),
    }
}

/// The state stream pipeline of one reactor, created on first access
/// to its [action](ReactorExt::action()) or
/// [state](ReactorExt::state()).
struct Pipeline<R: Reactor> {
    action: ActionSink<R::Action>,
    current_state: Rc<RefCell<R::State>>,
    state: Multicast<R::State>,
    /// Keeps the shared upstream computation running for as long as
    /// this pipeline exists.
    _cancellables: CancelBag,
}

impl<R: Reactor> Pipeline<R> {
    fn new(reactor: &Rc<R>) -> Self {
        let owner = Rc::downgrade(reactor);
        let initial_state = reactor.initial_state();
        let scheduler = reactor.scheduler();
        let action = ActionSink::new();
        let current_state = Rc::new(RefCell::new(initial_state.clone()));

        let actions = reactor.transform_action(action.subscribe().boxed_local());

        let mutate_owner = owner.clone();
        let mutations = actions
            .flat_map_unordered(None, move |action| {
                match mutate_owner.upgrade() {
                    Some(reactor) => {
                        let owner = mutate_owner.clone();
                        reactor
                            .mutate(action)
                            .take_while(move |_| future::ready(is_alive(&owner)))
                            .boxed_local()
                    }
                    None => stream::empty().boxed_local(),
                }
            })
            .boxed_local();

        let reduce_owner = owner;
        let reduced = reactor
            .transform_mutation(mutations)
            .scan(initial_state.clone(), move |state, mutation| {
                let next = reduce_owner.upgrade().map(|reactor| {
                    *state = reactor.reduce(state, mutation);
                    state.clone()
                });
                if next.is_none() {
                    log::debug!("{} dropped, ending its state stream", type_name::<R>());
                }
                future::ready(next)
            });

        let states = stream::once(future::ready(initial_state))
            .chain(reduced)
            .boxed_local();

        let cell = current_state.clone();
        let states = reactor.transform_state(states).inspect(move |state| {
            *cell.borrow_mut() = state.clone();
        });

        let connectable = Connectable::new(states);
        let state = connectable.multicast();
        let mut cancellables = CancelBag::new();
        connectable.connect(&scheduler).store(&mut cancellables);

        log::debug!("created state pipeline for {}", type_name::<R>());

        Self {
            action,
            current_state,
            state,
            _cancellables: cancellables,
        }
    }
}

impl<R: Reactor> Drop for Pipeline<R> {
    fn drop(&mut self) {
        log::debug!("tearing down state pipeline for {}", type_name::<R>());
    }
}

fn is_alive<T>(owner: &Weak<T>) -> bool {
    owner.strong_count() > 0
}

thread_local! {
    /// The [Pipeline] of every reactor on this thread, keyed by the
    /// reactor.
    static PIPELINES: RefCell<WeakMap<dyn Any, Rc<dyn Any>>> = RefCell::new(WeakMap::new());
}

/// Tear down the pipelines of every dropped reactor, and release the
/// reactors held for dropped views. Returns the number of entries
/// released.
pub(crate) fn prune_dropped_owners() -> usize {
    let views = crate::view::prune_view_bindings();

    let evicted = PIPELINES.with(|pipelines| match pipelines.try_borrow_mut() {
        Ok(mut pipelines) => pipelines.prune(),
        Err(_) => Vec::new(),
    });
    if !evicted.is_empty() {
        log::trace!("pruned {} dropped reactor pipelines", evicted.len());
    }

    views + evicted.len()
}

fn existing_pipeline<R: Reactor>(owner: &Rc<dyn Any>) -> Option<Rc<Pipeline<R>>> {
    prune_dropped_owners();
    PIPELINES
        .with(|pipelines| pipelines.borrow().get(owner).cloned())
        .and_then(|pipeline| pipeline.downcast::<Pipeline<R>>().ok())
}

fn pipeline<R: Reactor>(reactor: &Rc<R>) -> Rc<Pipeline<R>> {
    let owner: Rc<dyn Any> = reactor.clone();
    if let Some(pipeline) = existing_pipeline::<R>(&owner) {
        return pipeline;
    }

    // Built outside of the PIPELINES borrow, the reactor's hooks are
    // free to access other reactors.
    let pipeline = Rc::new(Pipeline::new(reactor));

    let replaced = PIPELINES.with(|pipelines| pipelines.borrow_mut().insert(&owner, pipeline.clone()));
    drop(replaced);

    pipeline
}

/// Access to the pipeline of a [Reactor] owned by an [Rc].
///
/// The pipeline is created once per reactor, on first access to
/// either [action()](ReactorExt::action()) or
/// [state()](ReactorExt::state()), and lives until the reactor is
/// dropped.
pub trait ReactorExt: Reactor + Sized {
    /// The sink to send `Action`s to this reactor with.
    fn action(self: &Rc<Self>) -> ActionSink<Self::Action>;

    /// The stream of `State`s of this reactor. Each subscriber first
    /// receives the current state.
    fn state(self: &Rc<Self>) -> Multicast<Self::State>;

    /// The last `State` produced by the pipeline, or the
    /// [initial_state()](Reactor::initial_state()) if nothing has been
    /// produced yet.
    fn current_state(self: &Rc<Self>) -> Self::State;
}

impl<R: Reactor> ReactorExt for R {
    fn action(self: &Rc<Self>) -> ActionSink<Self::Action> {
        pipeline(self).action.clone()
    }

    fn state(self: &Rc<Self>) -> Multicast<Self::State> {
        pipeline(self).state.clone()
    }

    fn current_state(self: &Rc<Self>) -> Self::State {
        let owner: Rc<dyn Any> = self.clone();
        match existing_pipeline::<Self>(&owner) {
            Some(pipeline) => pipeline.current_state.borrow().clone(),
            None => self.initial_state(),
        }
    }
}
