//! Prompt templates for the generation pipeline.

pub fn transcript() -> String {
    "Please transcribe this video. Include all spoken content, clearly \
     identifying speakers if possible."
        .to_string()
}

pub fn summary(transcript: &str) -> String {
    format!(
        "You are an assistant that summarizes meeting or video transcripts.\n\
         Based on the following transcript, provide a concise summary of the content.\n\
         Focus on the main discussion points, key decisions made, and overall outcomes.\n\
         Make sure the summary is well-structured with clear sections and bullet points where helpful.\n\
         \n\
         IMPORTANT: The summary must be less than 200 words. Be concise and focus only on the most important information.\n\
         \n\
         TRANSCRIPT:\n{transcript}"
    )
}

pub fn insights(transcript: &str) -> String {
    format!(
        "You are an assistant that extracts key insights from transcripts.\n\
         Based on the following transcript, identify 5-7 key insights, learnings,\n\
         or important points discussed.\n\
         \n\
         Format the response as a clear bulleted list with detailed explanations for each insight.\n\
         \n\
         TRANSCRIPT:\n{transcript}"
    )
}

pub fn action_items(transcript: &str) -> String {
    format!(
        "You are an assistant that extracts actionable tasks from transcripts.\n\
         Based on the following transcript, extract all action items.\n\
         \n\
         For each action item, identify:\n\
         1. The specific task to be completed\n\
         2. The person or team assigned to the task (owner)\n\
         3. The deadline or due date, if mentioned\n\
         \n\
         Format each action item with clear labels for Task, Owner, and Deadline.\n\
         If any information is not specified, mark it as \"Unspecified\".\n\
         \n\
         TRANSCRIPT:\n{transcript}"
    )
}

pub fn question_from_video(question: &str) -> String {
    format!("Based on this video, please answer the following question: {question}")
}

pub fn question_from_transcript(transcript: &str, question: &str) -> String {
    format!(
        "Based on the following video (in text format), please answer the question.\n\
         \n\
         VIDEO TRANSCRIPT:\n{transcript}\n\
         \n\
         QUESTION: {question}\n\
         \n\
         Please provide a clear and concise answer based only on the information in the video.\n\
         If the transcript doesn't contain enough information to answer the question, please say so."
    )
}
