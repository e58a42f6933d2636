use super::{CrudService, FailureMessages, NoFilter, Resource};
use crate::models::{Project, ProjectForm, ProjectPatch};

pub type ProjectService = CrudService<Project>;

impl Resource for Project {
    const SINGULAR: &'static str = "project";
    const PLURAL: &'static str = "projects";
    const MESSAGES: FailureMessages = FailureMessages {
        fetch_all: "프로젝트 목록을 불러오는데 실패했습니다",
        fetch_one: "프로젝트를 불러오는데 실패했습니다",
        create: "프로젝트 생성에 실패했습니다",
        update: "프로젝트 수정에 실패했습니다",
        delete: "프로젝트 삭제에 실패했습니다",
    };

    type Form = ProjectForm;
    type Patch = ProjectPatch;
    type Filter = NoFilter;
}
