//! Maintenance task CRUD and search. Requires a live session.

use estate_core::{Task, TaskId, TaskStore};

use crate::app::dto::{IdArgs, IdReply, TaskCreateArgs, TaskEditArgs, TaskFindArgs, TaskFindReply};
use crate::app::errors::HandlerError;
use crate::app::services::Services;
use crate::authz;

pub async fn create(services: &Services, args: TaskCreateArgs) -> Result<IdReply, HandlerError> {
    authz::acting_user(services, &args.token).await?;
    let id = services.store.create_task(args.into_new()).await?;
    Ok(IdReply { id: id.get() })
}

pub async fn info(services: &Services, args: IdArgs) -> Result<Task, HandlerError> {
    authz::acting_user(services, &args.token).await?;
    Ok(services.store.task_by_id(TaskId::new(args.id)).await?)
}

pub async fn edit(services: &Services, args: TaskEditArgs) -> Result<(), HandlerError> {
    let (token, id, patch) = args.split();
    authz::acting_user(services, &token).await?;
    services.store.update_task(id, patch).await?;
    Ok(())
}

pub async fn remove(services: &Services, args: IdArgs) -> Result<(), HandlerError> {
    authz::acting_user(services, &args.token).await?;
    services.store.remove_task(TaskId::new(args.id)).await?;
    Ok(())
}

pub async fn find(services: &Services, args: TaskFindArgs) -> Result<TaskFindReply, HandlerError> {
    let (token, filter, page) = args.split();
    authz::acting_user(services, &token).await?;
    let tasks = services.store.find_tasks(&filter, page).await?;
    Ok(TaskFindReply {
        count: tasks.len(),
        tasks,
    })
}
