// tests/sequential.rs

use std::cell::RefCell;

use dagrelay::batch::for_each_sequential;

#[tokio::test]
async fn processes_items_strictly_in_input_order() {
    let seen = RefCell::new(Vec::new());

    let result: Result<(), String> = for_each_sequential(1..=5, |item| {
        let seen = &seen;
        async move {
            seen.borrow_mut().push(item);
            Ok(())
        }
    })
    .await;

    assert!(result.is_ok());
    assert_eq!(*seen.borrow(), vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn halts_on_first_error_leaving_later_items_untouched() {
    let seen = RefCell::new(Vec::new());

    let result: Result<(), String> = for_each_sequential(1..=5, |item| {
        let seen = &seen;
        async move {
            seen.borrow_mut().push(item);
            if item == 3 {
                Err(format!("item {item} failed"))
            } else {
                Ok(())
            }
        }
    })
    .await;

    assert_eq!(result.unwrap_err(), "item 3 failed");
    assert_eq!(*seen.borrow(), vec![1, 2, 3]);
}

#[tokio::test]
async fn empty_input_is_a_no_op() {
    let result: Result<(), String> =
        for_each_sequential(Vec::<u32>::new(), |_| async { Ok(()) }).await;
    assert!(result.is_ok());
}
