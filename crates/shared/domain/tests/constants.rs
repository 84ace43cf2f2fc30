use moraine_domain::constants::{FALSE_LITERAL, SUCCESS, TASK_LOG_FILE, TRUE_LITERAL};
use moraine_domain::{ParamValue, TaskStatus};

#[test]
fn constants_match_file_literals() {
    assert_eq!(TRUE_LITERAL, "True");
    assert_eq!(FALSE_LITERAL, "False");
    assert_eq!(SUCCESS, "SUCCESS");
    assert_eq!(TASK_LOG_FILE, "log.txt");
}

#[test]
fn rendered_literals_use_the_constants() {
    assert_eq!(ParamValue::Bool(true).to_string(), TRUE_LITERAL);
    assert_eq!(TaskStatus::Success.to_string(), SUCCESS);
}
