//! Random sample data for trying the controllers out.

use chrono::Local;
use rand::seq::SliceRandom;
use rand::Rng;

use singleurlcrud_core::CrudResult;
use singleurlcrud_db::store::{all, delete, save};
use singleurlcrud_db::transactions::atomic;
use singleurlcrud_db::EntityStore;

use crate::models::{Author, Question};

// Random questions from http://www.cfcl.com/vlb/Memes/Questionaires/random_1.html
const QUESTIONS: &[&str] = &[
    "Grab the book nearest to you, turn to page 18, and find line 4.",
    "Stretch your left arm out as far as you can, What can you touch?",
    "Before you started this survey, what were you doing?",
    "What is the last thing you watched on TV?",
    "Without looking, guess what time it is",
    "Now look at the clock. What is the actual time?",
    "With the exception of the computer, what can you hear?",
    "When did you last step outside? What were you doing?",
    "Did you dream last night?",
    "Do you remember your dreams?",
    "When did you last laugh?",
    "Do you remember why / at what?",
    "What is on the walls of the room you are in?",
    "Seen anything weird lately?",
    "What do you think of this quiz?",
    "What is the last film you saw?",
    "If you could live anywhere in the world, where would you live?",
    "If you became a multi-millionaire overnight, what would you buy?",
    "Tell me something about you that most people don't know.",
    "If you could change one thing about the world, regardless of guilt or politics, what would you do?",
    "Do you like to dance?",
    "Would you ever consider living abroad?",
    "Does your name make any interesting anagrams?",
    "Who made the last incoming call on your phone?",
    "What is the last thing you downloaded onto your computer?",
    "Last time you swam in a pool?",
    "Type of music you like most?",
    "Type of music you dislike most?",
    "Are you listening to music right now?",
    "What color is your bedroom carpet?",
    "If you could change something about your home, without worry about expense or mess, what would you do?",
    "What was the last thing you bought?",
    "Have you ever ridden on a motorbike?",
    "Would you go bungee jumping or sky diving?",
    "Do you have a garden?",
    "Do you really know all the words to your national anthem?",
    "What is the first thing you think of when you wake up in the morning?",
    "If you could eat lunch with one famous person, who would it be?",
    "Who sent the last text message you received?",
    "Which store would you choose to max out your credit card?",
];

const AUTHORS: &[&str] = &[
    "Ramachandra Guha",
    "Chetan Bagat",
    "Catherine Lim",
    "VS Naipaul",
    "LKY",
    "Michael Chriton",
    "Louis Lamour",
    "Ian Fleming",
    "Arundati Roy",
    "Sugatha Kumari",
    "OMV Kurup",
    "Rajan Pothanikkad",
    "MT Vasudevan Nair",
    "Ezhuthachan",
    "Kumaran Aasaan",
];

/// How many rows [`create_testdata`] wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Created {
    pub authors: usize,
    pub questions: usize,
}

/// Replaces every author and question with `authors` random authors and
/// `questions` random questions, each published now by a random one of the
/// new authors (or by nobody when no authors were asked for).
///
/// Runs in one transaction; on error nothing changes.
pub async fn create_testdata(
    store: &dyn EntityStore,
    authors: usize,
    questions: usize,
    rng: &mut impl Rng,
) -> CrudResult<Created> {
    tracing::info!(authors, questions, "creating test data");

    let author_names: Vec<&str> = (0..authors)
        .filter_map(|_| AUTHORS.choose(rng).copied())
        .collect();
    let question_texts: Vec<&str> = (0..questions)
        .filter_map(|_| QUESTIONS.choose(rng).copied())
        .collect();
    let picks: Vec<usize> = (0..questions)
        .map(|_| if authors == 0 { 0 } else { rng.gen_range(0..authors) })
        .collect();

    let created = atomic(store, |tx| async move {
        let store: &dyn EntityStore = &*tx;
        for question in all::<Question>(store).await? {
            delete(store, &question).await?;
        }
        for author in all::<Author>(store).await? {
            delete(store, &author).await?;
        }

        let mut author_pks = Vec::with_capacity(author_names.len());
        for (index, name) in author_names.iter().enumerate() {
            tracing::debug!(index, name, "creating author");
            let mut author = Author::new(*name);
            save(store, &mut author).await?;
            author_pks.push(author.id);
        }

        let now = Local::now().naive_local();
        for (index, (text, pick)) in question_texts.iter().zip(&picks).enumerate() {
            tracing::debug!(index, text, "creating question");
            let mut question = Question {
                id: None,
                question_text: (*text).to_string(),
                pub_date: now,
                author: author_pks.get(*pick).copied().flatten(),
            };
            save(store, &mut question).await?;
        }

        Ok(Created {
            authors: author_names.len(),
            questions: question_texts.len(),
        })
    })
    .await?;

    tracing::info!(
        authors = created.authors,
        questions = created.questions,
        "created test records"
    );
    Ok(created)
}
