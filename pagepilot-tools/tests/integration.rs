#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use common::recording_manager;
use pagepilot_tools::*;
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[tokio::test]
async fn test_left_click_moves_then_clicks_then_screenshots() {
    let (manager, recorder) = recording_manager().await;
    let tool = ComputerTool::new(manager);

    let result = tool
        .execute(json!({"action": "left_click", "coordinate": [10, 20]}))
        .await
        .unwrap();

    assert_eq!(
        recorder.actions(),
        vec!["move 10,20", "click Left x1", "screenshot"]
    );
    assert!(result.output.is_none());
    assert!(result.image.is_some());
}

#[tokio::test]
async fn test_double_click_uses_two_clicks() {
    let (manager, recorder) = recording_manager().await;
    let tool = ComputerTool::new(manager);

    tool.execute(json!({"action": "double_click"})).await.unwrap();

    assert_eq!(recorder.actions(), vec!["click Left x2", "screenshot"]);
}

#[tokio::test]
async fn test_key_and_type_forward_text() {
    let (manager, recorder) = recording_manager().await;
    let tool = ComputerTool::new(manager);

    tool.execute(json!({"action": "key", "text": "ctrl+a"})).await.unwrap();
    tool.execute(json!({"action": "type", "text": "hello"})).await.unwrap();

    assert_eq!(
        recorder.actions(),
        vec!["key ctrl+a", "screenshot", "type hello", "screenshot"]
    );
}

#[tokio::test]
async fn test_cursor_position_reports_last_move() {
    let (manager, _recorder) = recording_manager().await;
    let tool = ComputerTool::new(manager);

    tool.execute(json!({"action": "mouse_move", "coordinate": [5, 6]}))
        .await
        .unwrap();
    let result = tool
        .execute(json!({"action": "cursor_position"}))
        .await
        .unwrap();

    assert_eq!(result.output.as_deref(), Some("X=5,Y=6"));
}

#[tokio::test]
async fn test_coordinate_outside_viewport_rejected() {
    let (manager, recorder) = recording_manager().await;
    let tool = ComputerTool::new(manager);

    let err = tool
        .execute(json!({"action": "mouse_move", "coordinate": [640, 10]}))
        .await
        .unwrap_err();

    assert!(matches!(err, ToolError::ValidationError(_)));
    assert!(err.to_string().contains("640x480"));
    assert!(recorder.actions().is_empty());
}

#[tokio::test]
async fn test_drag_ends_at_target() {
    let (manager, recorder) = recording_manager().await;
    let tool = ComputerTool::new(manager);

    tool.execute(json!({"action": "left_click_drag", "coordinate": [100, 200]}))
        .await
        .unwrap();

    assert_eq!(recorder.actions(), vec!["drag 100,200", "screenshot"]);
    assert_eq!(*recorder.cursor.lock(), (100, 200));
}

#[tokio::test]
async fn test_navigate_reports_final_url() {
    let (manager, recorder) = recording_manager().await;
    let tool = NavigateTool::new(manager);

    let result = tool
        .execute(json!({"url": "https://example.com"}))
        .await
        .unwrap();

    assert_eq!(result.output.as_deref(), Some("Navigated to https://example.com/"));
    assert!(result.image.is_some());
    assert_eq!(recorder.actions(), vec!["goto https://example.com", "screenshot"]);
}

#[tokio::test]
async fn test_javascript_returns_json() {
    let (manager, _recorder) = recording_manager().await;
    let tool = JavascriptTool::new(manager);

    let result = tool
        .execute(json!({"script": "document.title"}))
        .await
        .unwrap();

    let value: serde_json::Value = serde_json::from_str(result.output.as_deref().unwrap()).unwrap();
    assert_eq!(value["title"], "Example");
    assert!(result.image.is_none());
}

#[tokio::test]
async fn test_browser_failure_becomes_error_result() {
    let (manager, recorder) = recording_manager().await;
    recorder.fail_actions.store(true, Ordering::SeqCst);
    let dispatcher = ToolDispatcherImpl::new(Arc::new(browser_registry(manager)));

    let result = dispatcher
        .dispatch("navigate", json!({"url": "https://example.com"}))
        .await;

    let error = result.error.unwrap();
    assert!(error.starts_with("Tool navigate failed"));
    assert!(error.contains("page detached"));
}

#[tokio::test]
async fn test_tool_after_cleanup_reports_unavailable() {
    let (manager, _recorder) = recording_manager().await;
    let dispatcher = ToolDispatcherImpl::new(Arc::new(browser_registry(Arc::clone(&manager))));
    manager.cleanup().await;

    let result = dispatcher
        .dispatch("computer", json!({"action": "screenshot"}))
        .await;

    assert!(result.error.unwrap().starts_with("Resource unavailable"));
}

#[tokio::test]
async fn test_browser_registry_describes_tools_in_order() {
    let (manager, _recorder) = recording_manager().await;
    let registry = browser_registry(manager);

    let names: Vec<String> = registry.describe().into_iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["computer", "navigate", "javascript"]);
}
