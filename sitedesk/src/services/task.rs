use super::{CrudService, FailureMessages, ListFilter, Resource};
use crate::gateway::Command;
use crate::models::{Task, TaskFilter, TaskForm, TaskPatch};

pub type TaskService = CrudService<Task>;

impl ListFilter for TaskFilter {
    fn apply(&self, command: Command) -> Command {
        match self.project_id {
            Some(project_id) => command.arg("projectId", project_id),
            None => command,
        }
    }
}

impl Resource for Task {
    const SINGULAR: &'static str = "task";
    const PLURAL: &'static str = "tasks";
    const MESSAGES: FailureMessages = FailureMessages {
        fetch_all: "작업 목록을 가져오는데 실패했습니다",
        fetch_one: "작업을 가져오는데 실패했습니다",
        create: "작업 생성에 실패했습니다",
        update: "작업 수정에 실패했습니다",
        delete: "작업 삭제에 실패했습니다",
    };

    type Form = TaskForm;
    type Patch = TaskPatch;
    type Filter = TaskFilter;
}
