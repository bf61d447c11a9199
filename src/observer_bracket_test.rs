// Observer notifications: begin/end pairing and the rows they announce

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use crate::catalog::identity::ALL_NOTEBOOKS_ROOT_ID;
    use crate::catalog::NotebookCatalog;
    use crate::notebook::NotebookRecord;
    use crate::view::{CellValue, Column, ItemId, ModelObserver, Role, SortOrder, TreeAccessor};

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        BeginInsert(Option<ItemId>, usize, usize),
        EndInsert,
        BeginRemove(Option<ItemId>, usize, usize),
        EndRemove,
        LayoutAboutToChange,
        LayoutChanged,
        DataChanged(ItemId, Column, Column),
    }

    #[derive(Clone, Default)]
    struct Recorder {
        events: Arc<Mutex<Vec<Event>>>,
    }

    impl Recorder {
        fn take(&self) -> Vec<Event> {
            std::mem::take(&mut *self.events.lock().unwrap())
        }

        fn push(&self, event: Event) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl ModelObserver for Recorder {
        fn begin_insert_rows(&mut self, parent: Option<ItemId>, first: usize, last: usize) {
            self.push(Event::BeginInsert(parent, first, last));
        }
        fn end_insert_rows(&mut self) {
            self.push(Event::EndInsert);
        }
        fn begin_remove_rows(&mut self, parent: Option<ItemId>, first: usize, last: usize) {
            self.push(Event::BeginRemove(parent, first, last));
        }
        fn end_remove_rows(&mut self) {
            self.push(Event::EndRemove);
        }
        fn layout_about_to_change(&mut self) {
            self.push(Event::LayoutAboutToChange);
        }
        fn layout_changed(&mut self) {
            self.push(Event::LayoutChanged);
        }
        fn data_changed(&mut self, item: ItemId, first: Column, last: Column) {
            self.push(Event::DataChanged(item, first, last));
        }
    }

    fn recorded_catalog() -> (NotebookCatalog, Recorder) {
        let recorder = Recorder::default();
        (NotebookCatalog::new(Box::new(recorder.clone())), recorder)
    }

    /// Every begin is closed by the matching end before the next begin.
    fn assert_paired(events: &[Event]) {
        let mut open: Option<&Event> = None;
        for event in events {
            match event {
                Event::BeginInsert(..) | Event::BeginRemove(..) | Event::LayoutAboutToChange => {
                    assert!(open.is_none(), "nested bracket: {:?} inside {:?}", event, open);
                    open = Some(event);
                }
                Event::EndInsert => assert!(matches!(open.take(), Some(Event::BeginInsert(..)))),
                Event::EndRemove => assert!(matches!(open.take(), Some(Event::BeginRemove(..)))),
                Event::LayoutChanged => assert!(matches!(open.take(), Some(Event::LayoutAboutToChange))),
                Event::DataChanged(..) => assert!(open.is_none(), "data change inside a bracket"),
            }
        }
        assert!(open.is_none(), "unclosed bracket");
    }

    #[test]
    fn test_first_insert_creates_root_then_leaf() {
        let (mut catalog, recorder) = recorded_catalog();
        catalog.upsert_notebook(NotebookRecord::new_local("Work", None));

        assert_eq!(
            recorder.take(),
            vec![
                Event::BeginInsert(None, 0, 0),
                Event::EndInsert,
                Event::BeginInsert(Some(ALL_NOTEBOOKS_ROOT_ID), 0, 0),
                Event::EndInsert,
            ]
        );
    }

    #[test]
    fn test_stack_inserted_before_its_first_child() {
        let (mut catalog, recorder) = recorded_catalog();
        catalog.upsert_notebook(NotebookRecord::new_local("Work", None));
        recorder.take();

        catalog.upsert_notebook(NotebookRecord::new_local("Draft", Some("Projects")));
        let stack = catalog.item_for_stack("Projects", None).unwrap();
        assert_eq!(
            recorder.take(),
            vec![
                Event::BeginInsert(Some(ALL_NOTEBOOKS_ROOT_ID), 0, 0),
                Event::EndInsert,
                Event::BeginInsert(Some(stack), 0, 0),
                Event::EndInsert,
            ]
        );
    }

    #[test]
    fn test_removing_last_child_removes_stack_row() {
        let (mut catalog, recorder) = recorded_catalog();
        catalog.upsert_notebook(NotebookRecord::new_local("Alpha", None));
        let draft = NotebookRecord::new_local("Draft", Some("Projects"));
        let draft_id = draft.local_id.clone();
        catalog.upsert_notebook(draft);
        let stack = catalog.item_for_stack("Projects", None).unwrap();
        assert_eq!(catalog.row_of(stack), Some(1));
        recorder.take();

        catalog.remove_notebook(&draft_id);
        assert_eq!(
            recorder.take(),
            vec![
                Event::BeginRemove(Some(stack), 0, 0),
                Event::EndRemove,
                Event::BeginRemove(Some(ALL_NOTEBOOKS_ROOT_ID), 1, 1),
                Event::EndRemove,
            ]
        );
    }

    #[test]
    fn test_rename_is_remove_insert_then_data_change() {
        let (mut catalog, recorder) = recorded_catalog();
        let a = NotebookRecord::new_local("a", None);
        let a_id = a.local_id.clone();
        let item = catalog.upsert_notebook(a);
        catalog.upsert_notebook(NotebookRecord::new_local("b", None));
        recorder.take();

        catalog.rename_notebook(&a_id, "c").unwrap();
        assert_eq!(
            recorder.take(),
            vec![
                Event::BeginRemove(Some(ALL_NOTEBOOKS_ROOT_ID), 0, 0),
                Event::EndRemove,
                Event::BeginInsert(Some(ALL_NOTEBOOKS_ROOT_ID), 1, 1),
                Event::EndInsert,
                Event::DataChanged(item, Column::Name, Column::NoteCount),
            ]
        );
    }

    #[test]
    fn test_note_count_change_is_data_only() {
        let (mut catalog, recorder) = recorded_catalog();
        let record = NotebookRecord::new_local("a", None);
        let id = record.local_id.clone();
        let item = catalog.upsert_notebook(record);
        recorder.take();

        assert!(catalog.set_note_count(&id, 3));
        assert_eq!(recorder.take(), vec![Event::DataChanged(item, Column::NoteCount, Column::NoteCount)]);
        assert!(!catalog.set_note_count("missing", 3));
    }

    #[test]
    fn test_unchanged_note_count_is_silent() {
        let (mut catalog, recorder) = recorded_catalog();
        let record = NotebookRecord::new_local("a", None);
        let id = record.local_id.clone();
        catalog.upsert_notebook(record);
        assert!(catalog.set_note_count(&id, 3));
        recorder.take();

        assert!(!catalog.set_note_count(&id, 3));
        assert!(recorder.take().is_empty());
    }

    #[test]
    fn test_child_count_change_refreshes_stack_total() {
        let (mut catalog, recorder) = recorded_catalog();
        let record = NotebookRecord::new_local("A", Some("S"));
        let id = record.local_id.clone();
        let leaf = catalog.upsert_notebook(record);
        let stack = catalog.item_for_stack("S", None).unwrap();
        recorder.take();

        assert!(catalog.set_note_count(&id, 5));
        assert_eq!(
            recorder.take(),
            vec![
                Event::DataChanged(leaf, Column::NoteCount, Column::NoteCount),
                Event::DataChanged(stack, Column::NoteCount, Column::NoteCount),
            ]
        );
        assert_eq!(
            catalog.data(stack, Column::NoteCount, Role::Display),
            Some(CellValue::Count(5))
        );
    }

    #[test]
    fn test_counted_notebook_moving_between_stacks_refreshes_both() {
        let (mut catalog, recorder) = recorded_catalog();
        let mut record = NotebookRecord::new_local("A", Some("Old"));
        record.note_count = 4;
        catalog.upsert_notebook(record.clone());
        catalog.upsert_notebook(NotebookRecord::new_local("B", Some("Old")));
        catalog.upsert_notebook(NotebookRecord::new_local("C", Some("New")));
        let old = catalog.item_for_stack("Old", None).unwrap();
        let new = catalog.item_for_stack("New", None).unwrap();
        recorder.take();

        record.stack = Some("New".to_string());
        catalog.upsert_notebook(record);
        let events = recorder.take();
        assert_paired(&events);
        assert!(events.contains(&Event::DataChanged(old, Column::NoteCount, Column::NoteCount)));
        assert!(events.contains(&Event::DataChanged(new, Column::NoteCount, Column::NoteCount)));
    }

    #[test]
    fn test_removing_counted_notebook_refreshes_surviving_stack() {
        let (mut catalog, recorder) = recorded_catalog();
        let mut record = NotebookRecord::new_local("A", Some("S"));
        record.note_count = 2;
        let id = record.local_id.clone();
        catalog.upsert_notebook(record);
        catalog.upsert_notebook(NotebookRecord::new_local("B", Some("S")));
        let stack = catalog.item_for_stack("S", None).unwrap();
        recorder.take();

        catalog.remove_notebook(&id);
        assert_eq!(
            recorder.take(),
            vec![
                Event::BeginRemove(Some(stack), 0, 0),
                Event::EndRemove,
                Event::DataChanged(stack, Column::NoteCount, Column::NoteCount),
            ]
        );
    }

    #[test]
    fn test_sort_flip_is_one_layout_change() {
        let (mut catalog, recorder) = recorded_catalog();
        for name in ["a", "b", "c"] {
            catalog.upsert_notebook(NotebookRecord::new_local(name, Some("S")));
        }
        recorder.take();

        catalog.sort(Column::Name, SortOrder::Descending);
        assert_eq!(recorder.take(), vec![Event::LayoutAboutToChange, Event::LayoutChanged]);
        catalog.sort(Column::Name, SortOrder::Descending);
        assert!(recorder.take().is_empty(), "unchanged sort emits nothing");
    }

    #[test]
    fn test_busy_session_stays_paired() {
        let (mut catalog, recorder) = recorded_catalog();
        let mut ids = Vec::new();
        for i in 0..30 {
            let stack = match i % 3 {
                0 => None,
                1 => Some("One"),
                _ => Some("Two"),
            };
            let record = NotebookRecord::new_local(&format!("nb {:02}", i), stack);
            ids.push(record.local_id.clone());
            catalog.upsert_notebook(record);
        }
        catalog.rename_stack("One", "Two").unwrap();
        catalog.sort(Column::Name, SortOrder::Descending);
        for id in ids.iter().step_by(2) {
            catalog.remove_notebook(id);
        }
        catalog.dissolve_stack("Two").unwrap();

        assert_paired(&recorder.take());
        println!("✅ {} notebooks left, brackets balanced", catalog.len());
    }
}
