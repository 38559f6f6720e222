use std::{future::Future, marker::PhantomData};

use typed_builder::TypedBuilder;

use crate::{
    aggregate::Aggregate,
    error::Result,
    executor::{Execution, Executor},
    metric::Job,
};

/// Glue between what a job does (`action`) and how jobs are scheduled
/// (`executor`).
///
/// The action is cloned into every worker, so keep it cheap to clone: capture a
/// pooled client, never build one inside it.
#[derive(TypedBuilder)]
pub struct Scenario<A, E, F, Fut>
where
    A: Aggregate,
    E: Executor<A, F, Fut>,
    F: Fn(Job) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = A::Metric> + Send + 'static,
{
    #[builder(setter(into))]
    pub name: String,
    pub action: F,
    pub executor: E,
    #[builder(default, setter(skip))]
    marker: PhantomData<fn() -> (A, Fut)>,
}

impl<A, E, F, Fut> Scenario<A, E, F, Fut>
where
    A: Aggregate,
    E: Executor<A, F, Fut>,
    F: Fn(Job) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = A::Metric> + Send + 'static,
{
    pub async fn run(&self) -> Result<Execution<A>> {
        self.executor.exec(self).await
    }
}
